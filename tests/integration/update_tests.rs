//! Integration tests for the two-phase update: version check through
//! `UpdateOrchestrator`, image pull through the real `HttpUpdater`.

use embedded_hal::digital::PinState;

use fieldlink::app::events::{AppEvent, VersionCheckFailure};
use fieldlink::app::ports::{FirmwareUpdatePort, HttpError, TlsPolicy, UpdateError, UpdateOutcome};
use fieldlink::app::update::{CycleOutcome, UpdateOrchestrator, VersionCheck};
use fieldlink::drivers::status_led::UpdateLed;
use fieldlink::ota::{HttpUpdater, OtaError, OtaState};
use fieldlink::version::{Version, VersionError};

use super::mock_net::{
    firmware_image, CountingRestart, MockHttp, RecordingPin, RecordingSink, Reply, FIRMWARE_URL,
    VERSION_URL,
};

fn orchestrator(baseline: &str) -> UpdateOrchestrator {
    UpdateOrchestrator::new(
        Version::parse(baseline).unwrap(),
        VERSION_URL.into(),
        FIRMWARE_URL.into(),
    )
}

fn updater(http: &MockHttp) -> HttpUpdater<MockHttp, RecordingPin> {
    HttpUpdater::new(
        http.clone(),
        UpdateLed::new(RecordingPin::default(), PinState::Low),
    )
}

// ── Phase 1: version check ────────────────────────────────────

#[test]
fn version_check_uses_unverified_tls() {
    let http = MockHttp::default();
    http.route(VERSION_URL, Reply::text("1.0.0"));
    let mut orch = orchestrator("1.0.0");

    let check = orch.check_version(true, &mut http.clone(), &mut RecordingSink::default());

    assert_eq!(check, VersionCheck::UpToDate);
    assert_eq!(http.gets(), vec![(VERSION_URL.to_owned(), TlsPolicy::Insecure)]);
}

#[test]
fn surrounding_whitespace_is_ignored() {
    let http = MockHttp::default();
    http.route(VERSION_URL, Reply::text("  1.0.0\r\n"));
    let mut orch = orchestrator("1.0.0");

    assert_eq!(
        orch.check_version(true, &mut http.clone(), &mut RecordingSink::default()),
        VersionCheck::UpToDate
    );
}

#[test]
fn non_200_version_reply_is_a_failure() {
    let http = MockHttp::default();
    http.route(VERSION_URL, Reply::Status(500));
    let mut orch = orchestrator("1.0.0");
    let mut sink = RecordingSink::default();

    let check = orch.check_version(true, &mut http.clone(), &mut sink);

    assert_eq!(check, VersionCheck::Failed(VersionCheckFailure::Status(500)));
    assert_eq!(orch.current().as_str(), "1.0.0");
    assert_eq!(
        sink.events(),
        vec![AppEvent::VersionCheckFailed(VersionCheckFailure::Status(500))]
    );
}

#[test]
fn empty_and_oversized_bodies_are_malformed() {
    let http = MockHttp::default();
    let mut orch = orchestrator("1.0.0");

    http.route(VERSION_URL, Reply::text("   \n"));
    assert_eq!(
        orch.check_version(true, &mut http.clone(), &mut RecordingSink::default()),
        VersionCheck::Failed(VersionCheckFailure::Malformed(VersionError::Empty))
    );

    http.route(VERSION_URL, Reply::text(&"9".repeat(4096)));
    assert_eq!(
        orch.check_version(true, &mut http.clone(), &mut RecordingSink::default()),
        VersionCheck::Failed(VersionCheckFailure::Malformed(VersionError::TooLong))
    );
    assert_eq!(orch.current().as_str(), "1.0.0");
}

#[test]
fn version_change_is_cached_before_any_download() {
    let http = MockHttp::default();
    http.route(VERSION_URL, Reply::text("1.1.0"));
    let mut orch = orchestrator("1.0.0");

    assert_eq!(
        orch.check_version(true, &mut http.clone(), &mut RecordingSink::default()),
        VersionCheck::NewVersion
    );
    assert_eq!(orch.current().as_str(), "1.1.0");
    assert_eq!(http.gets_to(FIRMWARE_URL), 0);
}

// ── Phase 2: pull update ──────────────────────────────────────

#[test]
fn full_cycle_flashes_and_restarts() {
    let http = MockHttp::default();
    http.route(VERSION_URL, Reply::text("2.0.0"));
    http.route(FIRMWARE_URL, Reply::image(firmware_image(10_000)));
    let mut orch = orchestrator("1.0.0");
    let mut up = updater(&http);
    let mut restart = CountingRestart::default();

    let outcome = orch.check_and_update(
        true,
        &mut http.clone(),
        &mut up,
        &mut restart,
        &mut RecordingSink::default(),
    );

    assert_eq!(outcome, CycleOutcome::Restarted);
    assert_eq!(restart.count, 1);
    assert_eq!(up.ota_state(), OtaState::ReadyToReboot);
    assert_eq!(
        http.gets(),
        vec![
            (VERSION_URL.to_owned(), TlsPolicy::Insecure),
            (FIRMWARE_URL.to_owned(), TlsPolicy::Insecure),
        ]
    );
}

#[test]
fn not_modified_means_no_updates() {
    let http = MockHttp::default();
    http.route(FIRMWARE_URL, Reply::Status(304));
    let mut up = updater(&http);

    assert_eq!(up.update(FIRMWARE_URL), UpdateOutcome::NoUpdates);
    assert_eq!(up.ota_state(), OtaState::Idle);
    assert!(!up.led().is_lit());
}

#[test]
fn status_codes_map_to_update_errors() {
    let http = MockHttp::default();
    let mut up = updater(&http);

    for (status, expected) in [
        (403, UpdateError::Forbidden),
        (404, UpdateError::FileNotFound),
        (500, UpdateError::WrongHttpCode(500)),
        (302, UpdateError::WrongHttpCode(302)),
    ] {
        http.route(FIRMWARE_URL, Reply::Status(status));
        assert_eq!(up.update(FIRMWARE_URL), UpdateOutcome::Failed(expected));
    }
}

#[test]
fn missing_content_length_is_rejected() {
    let http = MockHttp::default();
    http.route(
        FIRMWARE_URL,
        Reply::Body {
            status: 200,
            content_length: None,
            body: firmware_image(1024),
        },
    );
    let mut up = updater(&http);

    let outcome = up.update(FIRMWARE_URL);
    assert_eq!(outcome, UpdateOutcome::Failed(UpdateError::ServerNotReportSize));
    assert_eq!(UpdateError::ServerNotReportSize.code(), -101);
    assert_eq!(up.ota_state(), OtaState::Idle);
}

#[test]
fn oversized_image_is_rejected_before_flashing() {
    let http = MockHttp::default();
    http.route(
        FIRMWARE_URL,
        Reply::Body {
            status: 200,
            content_length: Some(64 * 1024 * 1024),
            body: firmware_image(16),
        },
    );
    let mut up = updater(&http);

    assert_eq!(
        up.update(FIRMWARE_URL),
        UpdateOutcome::Failed(UpdateError::TooLessSpace)
    );
    assert_eq!(up.ota_state(), OtaState::Idle);
}

#[test]
fn wrong_magic_fails_header_verification() {
    let http = MockHttp::default();
    http.route(FIRMWARE_URL, Reply::image(vec![0x7F; 2048]));
    let mut up = updater(&http);

    assert_eq!(
        up.update(FIRMWARE_URL),
        UpdateOutcome::Failed(UpdateError::BinVerifyHeader)
    );
    assert_ne!(up.ota_state(), OtaState::ReadyToReboot);
}

#[test]
fn short_body_fails_finalize() {
    let http = MockHttp::default();
    http.route(
        FIRMWARE_URL,
        Reply::Body {
            status: 200,
            content_length: Some(8192),
            body: firmware_image(4096),
        },
    );
    let mut up = updater(&http);

    assert_eq!(
        up.update(FIRMWARE_URL),
        UpdateOutcome::Failed(UpdateError::Flash(OtaError::IncompleteTransfer))
    );
    assert_ne!(up.ota_state(), OtaState::ReadyToReboot);
}

#[test]
fn transport_failure_keeps_running_image() {
    let http = MockHttp::default();
    http.route(FIRMWARE_URL, Reply::Fail(HttpError::ReadTimeout));
    let mut up = updater(&http);

    let outcome = up.update(FIRMWARE_URL);
    assert_eq!(
        outcome,
        UpdateOutcome::Failed(UpdateError::Http(HttpError::ReadTimeout))
    );
    assert_eq!(UpdateError::Http(HttpError::ReadTimeout).code(), -11);
    assert!(!up.led().is_lit());
}

#[test]
fn updater_recovers_after_a_failed_attempt() {
    let http = MockHttp::default();
    let mut up = updater(&http);

    http.route(FIRMWARE_URL, Reply::image(vec![0x00; 512]));
    assert!(matches!(up.update(FIRMWARE_URL), UpdateOutcome::Failed(_)));

    http.route(FIRMWARE_URL, Reply::image(firmware_image(2048)));
    assert_eq!(up.update(FIRMWARE_URL), UpdateOutcome::Updated);
}
