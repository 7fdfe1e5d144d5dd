//! Scanner controller tests: badge decoding, meal-type inference, the
//! start/stop lifecycle, and the submit-result handling that decides
//! between reloading and restarting.

use std::time::Duration;

use messmate::models::attendance::MealType;
use messmate::scan::{
    AfterSubmit, CameraDevice, DeviceError, DecodeErrorKind, MarkMethod, PayloadError,
    ScanPayload, ScanState, ScannerController, SubmitReply, mark_request,
};
use messmate::view::notice::NoticeKind;

/// A camera stub that counts begin/end calls and can fail on demand.
#[derive(Default)]
struct FakeCamera {
    begins: usize,
    ends: usize,
    fail_begin: Option<DeviceError>,
    fail_end: bool,
}

impl CameraDevice for FakeCamera {
    fn begin(&mut self) -> Result<(), DeviceError> {
        self.begins += 1;
        match self.fail_begin.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn end(&mut self) -> Result<(), DeviceError> {
        self.ends += 1;
        if self.fail_end {
            Err(DeviceError::Other("teardown failed".to_string()))
        } else {
            Ok(())
        }
    }
}

fn controller() -> ScannerController<FakeCamera> {
    ScannerController::new(Some(FakeCamera::default()))
}

// --- Payload decoding ---

#[test]
fn test_payload_parses_valid_badge() {
    let payload = ScanPayload::parse(r#"{"student_id":"S100","name":"Asha"}"#).unwrap();
    assert_eq!(payload.student_id, "S100");
    assert_eq!(payload.name, "Asha");
}

#[test]
fn test_payload_accepts_numeric_student_id_and_ignores_extras() {
    let payload =
        ScanPayload::parse(r#"{"student_id":7,"name":"Asha","issued_at":"2026-03-02"}"#).unwrap();
    assert_eq!(payload.student_id, "7");
}

#[test]
fn test_payload_rejects_unstructured_text() {
    assert_eq!(ScanPayload::parse("hello world"), Err(PayloadError::NotStructured));
    assert_eq!(ScanPayload::parse("[1,2,3]"), Err(PayloadError::NotStructured));
}

#[test]
fn test_payload_rejects_missing_or_empty_fields() {
    assert_eq!(
        ScanPayload::parse(r#"{"name":"Asha"}"#),
        Err(PayloadError::MissingField("student_id"))
    );
    assert_eq!(
        ScanPayload::parse(r#"{"student_id":"  ","name":"Asha"}"#),
        Err(PayloadError::MissingField("student_id"))
    );
    assert_eq!(
        ScanPayload::parse(r#"{"student_id":"S100"}"#),
        Err(PayloadError::MissingField("name"))
    );
    assert_eq!(
        ScanPayload::parse(r#"{"student_id":"S100","name":""}"#),
        Err(PayloadError::MissingField("name"))
    );
}

// --- Meal inference ---

#[test]
fn test_meal_inference_is_pure_in_hour() {
    for hour in 0..15 {
        assert_eq!(MealType::for_hour(hour), MealType::Lunch, "hour {hour}");
    }
    for hour in 15..24 {
        assert_eq!(MealType::for_hour(hour), MealType::Dinner, "hour {hour}");
    }
}

#[test]
fn test_mark_request_carries_inferred_meal() {
    let payload = ScanPayload::parse(r#"{"student_id":"S100","name":"Asha"}"#).unwrap();

    let morning = mark_request(&payload, 10);
    assert_eq!(morning.student_id, "S100");
    assert_eq!(morning.meal_type, MealType::Lunch);
    assert_eq!(morning.method, MarkMethod::Qr);

    let boundary = mark_request(&payload, 15);
    assert_eq!(boundary.meal_type, MealType::Dinner);
}

// --- Lifecycle ---

#[test]
fn test_start_without_device_alerts_and_stays_idle() {
    let mut ctl: ScannerController<FakeCamera> = ScannerController::new(None);
    assert!(ctl.start().is_err());
    assert_eq!(ctl.state(), ScanState::Idle);
    assert_eq!(ctl.notice().unwrap().kind, NoticeKind::Error);
}

#[test]
fn test_start_and_stop_cycle() {
    let mut ctl = controller();

    assert!(ctl.controls().start_enabled);
    assert!(!ctl.controls().stop_enabled);

    ctl.start().unwrap();
    assert_eq!(ctl.state(), ScanState::Scanning);
    assert!(!ctl.controls().start_enabled);
    assert!(ctl.controls().stop_enabled);

    ctl.stop().unwrap();
    assert_eq!(ctl.state(), ScanState::Idle);
    assert!(ctl.controls().start_enabled);
}

#[test]
fn test_start_failure_returns_controls_to_idle() {
    let mut ctl = ScannerController::new(Some(FakeCamera {
        fail_begin: Some(DeviceError::PermissionDenied),
        ..FakeCamera::default()
    }));

    assert!(ctl.start().is_err());
    assert_eq!(ctl.state(), ScanState::Idle);
    assert!(ctl.controls().start_enabled);
    let notice = ctl.notice().unwrap();
    assert!(notice.message.contains("permission"));
}

#[test]
fn test_stop_failure_instructs_reload() {
    let mut ctl = ScannerController::new(Some(FakeCamera {
        fail_end: true,
        ..FakeCamera::default()
    }));
    ctl.start().unwrap();

    assert!(ctl.stop().is_err());
    assert!(ctl.notice().unwrap().message.contains("reload"));
}

// --- Decoding through the controller ---

#[test]
fn test_unstructured_decode_keeps_scanning() {
    let mut ctl = controller();
    ctl.start().unwrap();

    let request = ctl.on_decode("not json at all", 10);
    assert!(request.is_none());
    assert_eq!(ctl.state(), ScanState::Scanning);
    assert_eq!(ctl.notice().unwrap().kind, NoticeKind::Error);
}

#[test]
fn test_invalid_badge_issues_no_request() {
    let mut ctl = controller();
    ctl.start().unwrap();

    let request = ctl.on_decode(r#"{"student_id":"S100"}"#, 10);
    assert!(request.is_none());
    // Parsed as structured data: scanning stops regardless of validity.
    assert_eq!(ctl.state(), ScanState::Idle);
    assert_eq!(ctl.notice().unwrap().kind, NoticeKind::Error);
}

#[test]
fn test_valid_badge_stops_and_builds_request() {
    let mut ctl = controller();
    ctl.start().unwrap();

    let request = ctl.on_decode(r#"{"student_id":"S100","name":"Asha"}"#, 10).unwrap();
    assert_eq!(request.student_id, "S100");
    assert_eq!(request.meal_type, MealType::Lunch);
    assert_eq!(request.method, MarkMethod::Qr);

    assert_eq!(ctl.state(), ScanState::Idle);
    let notice = ctl.notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
    assert!(notice.message.contains("Asha"));
}

#[test]
fn test_no_code_in_frame_is_suppressed() {
    let mut ctl = controller();
    ctl.start().unwrap();

    assert!(ctl.on_decode_error(DecodeErrorKind::NoCodeInFrame).is_none());
    assert_eq!(ctl.state(), ScanState::Scanning);

    let surfaced = ctl.on_decode_error(DecodeErrorKind::Other("camera glitch".to_string()));
    assert!(surfaced.is_some());
    assert_eq!(ctl.state(), ScanState::Scanning);
}

// --- Submit results ---

#[test]
fn test_accepted_submit_schedules_reload() {
    let mut ctl = controller();
    ctl.start().unwrap();
    ctl.on_decode(r#"{"student_id":"S100","name":"Asha"}"#, 10).unwrap();

    let after = ctl.on_submit_result(Ok(SubmitReply::Accepted));
    assert_eq!(after, AfterSubmit::ReloadAfter(Duration::from_secs(2)));
    assert_eq!(ctl.notice().unwrap().kind, NoticeKind::Success);
}

#[test]
fn test_rejected_submit_restarts_scanner() {
    let mut ctl = controller();
    ctl.start().unwrap();
    ctl.on_decode(r#"{"student_id":"S100","name":"Asha"}"#, 10).unwrap();
    assert_eq!(ctl.state(), ScanState::Idle);

    let after = ctl.on_submit_result(Ok(SubmitReply::Rejected(
        "Attendance for lunch already marked".to_string(),
    )));
    assert_eq!(after, AfterSubmit::Restarted);
    assert_eq!(ctl.state(), ScanState::Scanning);
    let notice = ctl.notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.message.contains("already marked"));
}

#[test]
fn test_transport_failure_restarts_scanner() {
    let mut ctl = controller();
    ctl.start().unwrap();
    ctl.on_decode(r#"{"student_id":"S100","name":"Asha"}"#, 10).unwrap();

    let after = ctl.on_submit_result(Err("connection refused".to_string()));
    assert_eq!(after, AfterSubmit::Restarted);
    assert_eq!(ctl.state(), ScanState::Scanning);
}
