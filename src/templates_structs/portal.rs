use askama::Template;

use super::PortalContext;
use crate::models::attendance::AttendanceRecord;
use crate::models::bill::{Bill, PaymentStatus};
use crate::models::payment::Payment;
use crate::models::student::Student;

#[derive(Template)]
#[template(path = "portal/login.html")]
pub struct PortalLoginTemplate {
    pub error: Option<String>,
    pub csrf_token: String,
}

#[derive(Template)]
#[template(path = "portal/dashboard.html")]
pub struct PortalDashboardTemplate {
    pub ctx: PortalContext,
    pub month_total: i64,
    pub lunch_count: i64,
    pub dinner_count: i64,
    pub today_meals: Vec<AttendanceRecord>,
    pub current_bill: Option<Bill>,
    pub recent_payments: Vec<Payment>,
    pub recent_meals: Vec<AttendanceRecord>,
}

/// One cell of the month grid on the portal attendance page.
pub struct CalendarDay {
    pub day: u32,
    pub is_future: bool,
    pub has_lunch: bool,
    pub has_dinner: bool,
}

#[derive(Template)]
#[template(path = "portal/attendance.html")]
pub struct PortalAttendanceTemplate {
    pub ctx: PortalContext,
    pub month_name: &'static str,
    pub year: i32,
    /// Leading blanks so the first day lands on its weekday column.
    pub leading_blanks: usize,
    pub days: Vec<CalendarDay>,
    pub prev_month: u32,
    pub prev_year: i32,
    pub next_month: u32,
    pub next_year: i32,
    pub records: Vec<AttendanceRecord>,
    pub lunch_count: i64,
    pub dinner_count: i64,
}

pub struct PortalBillView {
    pub bill: Bill,
    pub status: PaymentStatus,
}

#[derive(Template)]
#[template(path = "portal/bills.html")]
pub struct PortalBillsTemplate {
    pub ctx: PortalContext,
    pub bills: Vec<PortalBillView>,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub outstanding_amount: f64,
    pub recent_payments: Vec<Payment>,
}

#[derive(Template)]
#[template(path = "portal/profile.html")]
pub struct PortalProfileTemplate {
    pub ctx: PortalContext,
    pub student: Student,
    pub errors: Vec<String>,
}
