use askama::Template;

use super::PageContext;
use crate::models::bill::{Bill, PaymentStatus};
use crate::models::student::Student;

/// A bill row with its derived settlement state.
pub struct BillView {
    pub bill: Bill,
    pub status: PaymentStatus,
}

#[derive(Template)]
#[template(path = "billing.html")]
pub struct BillingTemplate {
    pub ctx: PageContext,
    pub bills: Vec<BillView>,
    pub students: Vec<Student>,
    pub current_month: u32,
    pub current_year: i32,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub pending_amount: f64,
}
