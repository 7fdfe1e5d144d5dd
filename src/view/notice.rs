use std::time::Duration;

/// How long a floating notice stays on screen before dismissing itself.
pub const AUTO_DISMISS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// A non-blocking, auto-dismissing alert. Nothing in this layer is fatal
/// to the page; every failure ends up as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice { kind: NoticeKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice { kind: NoticeKind::Error, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notice { kind: NoticeKind::Info, message: message.into() }
    }
}

/// Single-slot notification area: showing a new notice replaces whatever
/// is currently displayed.
#[derive(Debug, Default)]
pub struct NotificationSlot {
    current: Option<Notice>,
}

impl NotificationSlot {
    pub fn show(&mut self, notice: Notice) {
        self.current = Some(notice);
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }
}
