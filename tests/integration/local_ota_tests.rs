//! Integration test for the LAN push path: a real TCP client pushes an
//! image to `LocalOtaListener` while `AppService` keeps ticking.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use embedded_hal::digital::PinState;
use rand::rngs::StdRng;
use rand::SeedableRng;

use fieldlink::adapters::local_ota::LocalOtaListener;
use fieldlink::app::events::AppEvent;
use fieldlink::app::service::{AppService, DeviceIo};
use fieldlink::drivers::status_led::UpdateLed;
use fieldlink::ota::HttpUpdater;

use super::mock_net::{
    firmware_image, test_config, CountingDelay, CountingRestart, MockClock, MockHttp, MockWifi,
    RecordingPin, RecordingSink,
};

#[test]
fn pushed_image_triggers_restart_from_the_main_loop() {
    let config = test_config();
    let mut app = AppService::new(&config, StdRng::seed_from_u64(1));
    let http = MockHttp::default();
    let listener =
        LocalOtaListener::bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut io = DeviceIo {
        wifi: MockWifi::online(),
        local_ota: listener,
        clock: MockClock::synced(),
        http: http.clone(),
        updater: HttpUpdater::new(
            http.clone(),
            UpdateLed::new(RecordingPin::default(), PinState::Low),
        ),
        restart: CountingRestart::default(),
    };
    let mut sink = RecordingSink::default();
    app.setup(&mut io.wifi, &mut CountingDelay::default(), &mut sink);

    let image = firmware_image(5000);
    let mut client = TcpStream::connect(addr).unwrap();
    client.write_all(&(image.len() as u32).to_le_bytes()).unwrap();
    client.write_all(&image).unwrap();

    let mut restarted = false;
    for _ in 0..2000 {
        if app.tick(&mut io, &mut sink).restarted {
            restarted = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    assert!(restarted);
    assert_eq!(io.restart.count, 1);
    assert_eq!(sink.count(|e| *e == AppEvent::LocalOtaReceived), 1);

    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut reply = [0u8; 3];
    client.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"OK\n");
}
