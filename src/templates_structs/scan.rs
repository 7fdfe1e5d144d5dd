use askama::Template;

use crate::models::scan_session::ScanSession;
use crate::models::student::Student;

/// The public self-scan page served to a valid session token.
#[derive(Template)]
#[template(path = "scan.html")]
pub struct ScanPageTemplate {
    pub session: ScanSession,
    pub students: Vec<Student>,
    pub logged_in_student_id: Option<i64>,
}

#[derive(Template)]
#[template(path = "scan_error.html")]
pub struct ScanErrorTemplate {
    pub message: String,
}
