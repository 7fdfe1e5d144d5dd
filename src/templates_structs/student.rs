use askama::Template;

use super::PageContext;
use crate::models::student::StudentPage;

#[derive(Template)]
#[template(path = "students.html")]
pub struct StudentListTemplate {
    pub ctx: PageContext,
    pub page: StudentPage,
}

#[derive(Template)]
#[template(path = "student_form.html")]
pub struct StudentFormTemplate {
    pub ctx: PageContext,
    pub errors: Vec<String>,
}
