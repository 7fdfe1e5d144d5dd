// Template context structures for Askama templates, organized by domain.

use actix_session::Session;
use rusqlite::Connection;

use crate::auth::csrf;
use crate::auth::session::{require_admin, require_student, take_flash};
use crate::errors::AppError;
use crate::models::mess;

/// Common context shared by all admin pages.
/// Templates access these as `ctx.username`, `ctx.csrf_token`, etc.
pub struct PageContext {
    pub username: String,
    pub mess_id: i64,
    pub mess_name: String,
    pub flash: Option<String>,
    pub csrf_token: String,
    /// Current path, for marking the active nav link.
    pub active: String,
}

impl PageContext {
    pub fn build(
        session: &Session,
        conn: &Connection,
        current_path: &str,
    ) -> Result<Self, AppError> {
        let admin = require_admin(session)?;
        let mess_name = mess::find_by_id(conn, admin.mess_id)?
            .map(|m| m.name)
            .unwrap_or_else(|| "Mess".to_string());
        let flash = take_flash(session);
        let csrf_token = csrf::get_or_create_token(session);
        Ok(Self {
            username: admin.username,
            mess_id: admin.mess_id,
            mess_name,
            flash,
            csrf_token,
            active: current_path.to_string(),
        })
    }
}

/// Context for student-portal pages.
pub struct PortalContext {
    pub student_id: i64,
    pub student_name: String,
    pub flash: Option<String>,
    pub csrf_token: String,
    pub active: String,
}

impl PortalContext {
    pub fn build(session: &Session, current_path: &str) -> Result<Self, AppError> {
        let (student_id, student_name) = require_student(session)?;
        let flash = take_flash(session);
        let csrf_token = csrf::get_or_create_token(session);
        Ok(Self {
            student_id,
            student_name,
            flash,
            csrf_token,
            active: current_path.to_string(),
        })
    }
}

mod attendance;
mod billing;
mod common;
mod portal;
mod scan;
mod student;

pub use self::attendance::AttendanceTemplate;
pub use self::billing::{BillView, BillingTemplate};
pub use self::common::{
    DashboardTemplate, IndexTemplate, LoginTemplate, ProfileTemplate, SettingsTemplate,
    SignupTemplate,
};
pub use self::portal::{
    CalendarDay, PortalAttendanceTemplate, PortalBillView, PortalBillsTemplate,
    PortalDashboardTemplate, PortalLoginTemplate, PortalProfileTemplate,
};
pub use self::scan::{ScanErrorTemplate, ScanPageTemplate};
pub use self::student::{StudentFormTemplate, StudentListTemplate};
