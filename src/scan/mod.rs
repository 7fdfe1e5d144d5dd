//! Camera-scanner controller: owns the scanning widget's lifecycle and
//! turns a decoded badge into an attendance-mark request.
//!
//! The camera itself sits behind [`CameraDevice`] so the controller is a
//! plain state machine: start/stop acquire and release the device, decode
//! callbacks feed it text, and the submit result decides whether the page
//! reloads or the scanner restarts for a retry. The controller is reusable
//! across any number of scan cycles; nothing here is a terminal state.

mod payload;

pub use payload::{PayloadError, ScanPayload};

use std::time::Duration;

use serde::Serialize;

use crate::models::attendance::MealType;
use crate::view::notice::Notice;

/// Delay before reloading the page after a successful mark, so the
/// success notice is visible and the new row appears on reload.
pub const RELOAD_DELAY: Duration = Duration::from_secs(2);

/// Device-level failures when acquiring or releasing the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    PermissionDenied,
    NotFound,
    InUse,
    Other(String),
}

impl DeviceError {
    /// Actionable message for the operator.
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::PermissionDenied => {
                "Camera permission denied. Allow camera access and try again.".to_string()
            }
            DeviceError::NotFound => "No camera found on this device.".to_string(),
            DeviceError::InUse => {
                "Camera is in use by another application. Close it and try again.".to_string()
            }
            DeviceError::Other(msg) => format!("Could not start the camera: {msg}"),
        }
    }
}

/// The camera-backed scanning widget, reduced to the two operations the
/// controller needs. Exactly one device exists per page.
pub trait CameraDevice {
    /// Begin rendering frames and decoding.
    fn begin(&mut self) -> Result<(), DeviceError>;
    /// Tear down the camera resource.
    fn end(&mut self) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Starting,
    Scanning,
}

/// Enablement and labels of the start/stop controls — a pure function of
/// the scanner state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPanel {
    pub start_enabled: bool,
    pub start_label: &'static str,
    pub stop_enabled: bool,
}

/// Decode callbacks that did not produce text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The frame simply contained no code. Expected continuously while
    /// scanning; never surfaced.
    NoCodeInFrame,
    Other(String),
}

/// How the attendance was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkMethod {
    Qr,
    Manual,
}

impl MarkMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkMethod::Qr => "qr",
            MarkMethod::Manual => "manual",
        }
    }
}

/// The request body posted to the mark-attendance endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceMarkRequest {
    pub student_id: String,
    pub meal_type: MealType,
    pub method: MarkMethod,
}

/// The server's answer to a mark request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReply {
    Accepted,
    /// `success: false` (or a non-2xx status) with the server's message.
    Rejected(String),
}

/// What the page should do after a submit result was applied.
#[derive(Debug, PartialEq, Eq)]
pub enum AfterSubmit {
    /// Mark recorded: reload once the delay elapses.
    ReloadAfter(Duration),
    /// Mark failed: the scanner was restarted so the user can retry.
    Restarted,
    /// Mark failed and the scanner could not restart either.
    Stuck,
}

pub struct ScannerController<D: CameraDevice> {
    device: Option<D>,
    state: ScanState,
    notice: Option<Notice>,
}

impl<D: CameraDevice> ScannerController<D> {
    pub fn new(device: Option<D>) -> Self {
        ScannerController { device, state: ScanState::Idle, notice: None }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The most recent notice, leaving it in place for the view.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn controls(&self) -> ControlPanel {
        match self.state {
            ScanState::Idle => ControlPanel {
                start_enabled: true,
                start_label: "Start Scanning",
                stop_enabled: false,
            },
            ScanState::Starting | ScanState::Scanning => ControlPanel {
                start_enabled: false,
                start_label: "Starting…",
                stop_enabled: true,
            },
        }
    }

    /// Acquire the camera and begin scanning. Clears prior result notices.
    pub fn start(&mut self) -> Result<(), Notice> {
        self.notice = None;
        let Some(device) = self.device.as_mut() else {
            let notice = Notice::error("Scanner is not ready. Reload the page and try again.");
            self.notice = Some(notice.clone());
            return Err(notice);
        };

        self.state = ScanState::Starting;
        match device.begin() {
            Ok(()) => {
                self.state = ScanState::Scanning;
                Ok(())
            }
            Err(e) => {
                // Controls return to the idle state so the user can retry.
                self.state = ScanState::Idle;
                let notice = Notice::error(e.user_message());
                self.notice = Some(notice.clone());
                Err(notice)
            }
        }
    }

    /// Release the camera. A missing device is a no-op; a teardown failure
    /// leaves the state untouched and tells the user to reload.
    pub fn stop(&mut self) -> Result<(), Notice> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        match device.end() {
            Ok(()) => {
                self.state = ScanState::Idle;
                Ok(())
            }
            Err(DeviceError::Other(msg)) => {
                let notice =
                    Notice::error(format!("Could not stop the scanner: {msg}. Please reload the page."));
                self.notice = Some(notice.clone());
                Err(notice)
            }
            Err(_) => {
                let notice =
                    Notice::error("Could not stop the scanner. Please reload the page.");
                self.notice = Some(notice.clone());
                Err(notice)
            }
        }
    }

    /// A frame decoded into text. Returns the mark request to submit when
    /// the badge is valid; `None` otherwise.
    ///
    /// Text that does not parse as a badge at all leaves the scanner
    /// running — it was probably some unrelated code in the frame. Once
    /// the text parses as structured data the scanner stops regardless of
    /// field validity, and is only restarted on submission failure.
    pub fn on_decode(&mut self, text: &str, hour: u32) -> Option<AttendanceMarkRequest> {
        match ScanPayload::parse(text) {
            Err(PayloadError::NotStructured) => {
                self.notice = Some(Notice::error(PayloadError::NotStructured.to_string()));
                None
            }
            Err(e @ PayloadError::MissingField(_)) => {
                let _ = self.stop();
                self.notice = Some(Notice::error(e.to_string()));
                None
            }
            Ok(payload) => {
                let _ = self.stop();
                self.notice = Some(Notice::success(format!("Scanned {}", payload.name)));
                Some(mark_request(&payload, hour))
            }
        }
    }

    /// A decode attempt failed below the text level. "No code in frame" is
    /// the steady state of continuous scanning and is swallowed; anything
    /// else surfaces as a transient notice without touching the state.
    pub fn on_decode_error(&mut self, kind: DecodeErrorKind) -> Option<Notice> {
        match kind {
            DecodeErrorKind::NoCodeInFrame => None,
            DecodeErrorKind::Other(msg) => {
                let notice = Notice::error(format!("Scan error: {msg}"));
                self.notice = Some(notice.clone());
                Some(notice)
            }
        }
    }

    /// Apply the server's verdict on the mark request.
    pub fn on_submit_result(&mut self, result: Result<SubmitReply, String>) -> AfterSubmit {
        match result {
            Ok(SubmitReply::Accepted) => {
                self.notice = Some(Notice::success("Attendance marked successfully"));
                AfterSubmit::ReloadAfter(RELOAD_DELAY)
            }
            Ok(SubmitReply::Rejected(message)) => self.resume_after_failure(message),
            Err(transport) => {
                self.resume_after_failure(format!("Could not reach the server: {transport}"))
            }
        }
    }

    fn resume_after_failure(&mut self, message: String) -> AfterSubmit {
        let failure = Notice::error(message);
        // Restart so the user can retry without reloading. start() clears
        // the notice, so surface the failure after it.
        let restarted = self.start().is_ok();
        self.notice = Some(failure);
        if restarted { AfterSubmit::Restarted } else { AfterSubmit::Stuck }
    }
}

/// Build the mark request for a scanned badge: the meal type comes from
/// the local hour, never from the badge.
pub fn mark_request(payload: &ScanPayload, hour: u32) -> AttendanceMarkRequest {
    AttendanceMarkRequest {
        student_id: payload.student_id.clone(),
        meal_type: MealType::for_hour(hour),
        method: MarkMethod::Qr,
    }
}
