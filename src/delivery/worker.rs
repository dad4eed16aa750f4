//! Delivery workers: one detached thread per lane.
//!
//! Each worker parks in `futures_lite::future::block_on` on its lane's
//! `receive()` and wakes when the scheduler queues a job. Workers are
//! never joined; a delivery lasts at most one HTTP client timeout.

use std::io;
use std::sync::Arc;

use log::info;

use super::{DeliveryJob, DeliveryPool, Lane};
use crate::app::events::{AppEvent, DeliveryFailure};
use crate::app::ports::{EventSink, HttpClientPort, TlsPolicy};
use crate::drivers::task_pin::{spawn_on_core, Core};

const WORKER_NAMES: [&str; crate::config::MAX_WORKERS] = ["tlm-0\0", "tlm-1\0", "tlm-2\0", "tlm-3\0"];
const WORKER_PRIORITY: u8 = 5;
const WORKER_STACK_KB: usize = 12;

const JSON_HEADERS: [(&str, &str); 1] = [("Content-Type", "application/json")];

/// POST one job. Any 2xx is success; everything else is a failure.
pub fn deliver(http: &mut impl HttpClientPort, job: &DeliveryJob) -> Result<u16, DeliveryFailure> {
    match http.post(
        &job.endpoint,
        TlsPolicy::Verified,
        &JSON_HEADERS,
        job.payload.as_bytes(),
    ) {
        Ok(status) if (200..300).contains(&status) => Ok(status),
        Ok(status) => Err(DeliveryFailure::Status(status)),
        Err(e) => Err(DeliveryFailure::Transport(e)),
    }
}

fn report(job: &DeliveryJob, result: Result<u16, DeliveryFailure>, sink: &mut impl EventSink) {
    let endpoint = job.endpoint.clone();
    match result {
        Ok(status) => sink.emit(&AppEvent::TelemetrySent { endpoint, status }),
        Err(reason) => sink.emit(&AppEvent::TelemetryFailed { endpoint, reason }),
    }
}

async fn drain_lane<H: HttpClientPort, S: EventSink>(lane: Arc<Lane>, mut http: H, mut sink: S) {
    loop {
        let job = lane.receive().await;
        let result = deliver(&mut http, &job);
        report(&job, result, &mut sink);
    }
}

/// Start one worker per lane on the protocol core.
///
/// Each worker gets its own clone of the HTTP client and the sink.
pub fn spawn_workers<H, S>(pool: &DeliveryPool, http: &H, sink: &S) -> io::Result<()>
where
    H: HttpClientPort + Clone + Send + 'static,
    S: EventSink + Clone + Send + 'static,
{
    for (index, name) in WORKER_NAMES.iter().enumerate().take(pool.lane_count()) {
        let Some(lane) = pool.lane(index) else {
            break;
        };
        let http = http.clone();
        let sink = sink.clone();
        spawn_on_core(Core::Pro, WORKER_PRIORITY, WORKER_STACK_KB, name, move || {
            futures_lite::future::block_on(drain_lane(lane, http, sink));
        })?;
    }
    info!("Delivery: {} worker(s) running", pool.lane_count());
    Ok(())
}
