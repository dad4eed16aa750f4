//! Integration tests for telemetry delivery: dispatcher → lanes →
//! worker threads → HTTP POST → outcome events.

use rand::rngs::StdRng;
use rand::SeedableRng;

use fieldlink::app::events::{AppEvent, DeliveryFailure};
use fieldlink::app::ports::{HttpError, TlsPolicy};
use fieldlink::app::telemetry::TelemetryDispatcher;
use fieldlink::delivery::{deliver, spawn_workers, DeliveryJob, DeliveryPool, LANE_DEPTH};

use super::mock_net::{MockClock, MockHttp, RecordingSink, TELEMETRY_A, TELEMETRY_B};

fn dispatcher(endpoints: &[&str]) -> TelemetryDispatcher<StdRng> {
    TelemetryDispatcher::new(
        endpoints.iter().map(|e| (*e).to_owned()).collect(),
        StdRng::seed_from_u64(3),
    )
}

#[test]
fn workers_post_every_queued_record() {
    let http = MockHttp::default();
    let sink = RecordingSink::default();
    let mut pool = DeliveryPool::new(2);
    spawn_workers(&pool, &http, &sink).unwrap();

    let mut telemetry = dispatcher(&[TELEMETRY_A, TELEMETRY_B]);
    let summary = telemetry.dispatch_all(
        true,
        &MockClock::synced(),
        &mut pool,
        &mut sink.clone(),
    );
    assert_eq!(summary.queued, 2);

    assert!(sink.wait_for(2, |e| matches!(e, AppEvent::TelemetrySent { status: 200, .. })));

    let mut posts = http.posts();
    posts.sort_by(|a, b| a.url.cmp(&b.url));
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].url, TELEMETRY_A);
    assert_eq!(posts[1].url, TELEMETRY_B);
    for post in &posts {
        assert_eq!(post.tls, TlsPolicy::Verified);
        assert_eq!(post.content_type.as_deref(), Some("application/json"));
        let json: serde_json::Value = serde_json::from_str(&post.body).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01T12:34:56Z");
    }
}

#[test]
fn worker_reports_server_rejection() {
    let http = MockHttp::default();
    http.post_reply(Ok(503));
    let sink = RecordingSink::default();
    let mut pool = DeliveryPool::new(1);
    spawn_workers(&pool, &http, &sink).unwrap();

    pool.submit(DeliveryJob {
        endpoint: TELEMETRY_A.into(),
        payload: "{}".into(),
    })
    .unwrap();

    assert!(sink.wait_for(1, |e| {
        *e == AppEvent::TelemetryFailed {
            endpoint: TELEMETRY_A.into(),
            reason: DeliveryFailure::Status(503),
        }
    }));
}

#[test]
fn transport_errors_surface_as_delivery_failures() {
    let http = MockHttp::default();
    http.post_reply(Err(HttpError::ConnectionFailed));
    let job = DeliveryJob {
        endpoint: TELEMETRY_B.into(),
        payload: "{}".into(),
    };

    assert_eq!(
        deliver(&mut http.clone(), &job),
        Err(DeliveryFailure::Transport(HttpError::ConnectionFailed))
    );
}

#[test]
fn saturated_lanes_drop_instead_of_blocking() {
    // No workers: nothing drains the single lane.
    let mut pool = DeliveryPool::new(1);
    let endpoints: Vec<String> = (0..LANE_DEPTH + 2)
        .map(|i| format!("https://c{i}.example/api/data"))
        .collect();
    let refs: Vec<&str> = endpoints.iter().map(String::as_str).collect();
    let mut telemetry = dispatcher(&refs);
    let sink = RecordingSink::default();

    let summary = telemetry.dispatch_all(true, &MockClock::synced(), &mut pool, &mut sink.clone());

    assert_eq!(summary.queued, LANE_DEPTH);
    assert_eq!(summary.dropped, 2);
    assert_eq!(pool.pending(), LANE_DEPTH);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TelemetryDropped { .. })), 2);
}

#[test]
fn offline_dispatch_touches_nothing() {
    let mut pool = DeliveryPool::new(2);
    let mut telemetry = dispatcher(&[TELEMETRY_A, TELEMETRY_B]);
    let sink = RecordingSink::default();

    let summary = telemetry.dispatch_all(false, &MockClock::synced(), &mut pool, &mut sink.clone());

    assert!(summary.skipped);
    assert_eq!(summary.queued, 0);
    assert_eq!(pool.pending(), 0);
    assert_eq!(sink.events(), vec![AppEvent::TelemetrySkipped { endpoints: 2 }]);
}
