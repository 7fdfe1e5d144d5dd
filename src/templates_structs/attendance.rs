use askama::Template;

use super::PageContext;
use crate::models::attendance::AttendanceRecord;
use crate::models::attendance::filter::FilterState;
use crate::models::student::Student;

#[derive(Template)]
#[template(path = "attendance.html")]
pub struct AttendanceTemplate {
    pub ctx: PageContext,
    pub students: Vec<Student>,
    pub records: Vec<AttendanceRecord>,
    pub filter: FilterState,
    pub current_meal: &'static str,
    pub today: String,
}
