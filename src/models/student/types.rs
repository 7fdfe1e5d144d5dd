use serde::Deserialize;

/// Full student record, including the portal password hash.
#[derive(Debug, Clone)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub roll_no: String,
    pub department: String,
    pub contact: String,
    pub email: String,
    pub address: String,
    pub password_hash: Option<String>,
    pub mess_id: i64,
    pub created_at: String,
}

/// Pagination metadata for the roster page.
pub struct StudentPage {
    pub students: Vec<Student>,
    pub page: i64,
    pub per_page: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

/// New student data for creation; roll number and password are generated.
pub struct NewStudent {
    pub name: String,
    pub department: String,
    pub contact: String,
    pub email: String,
    pub address: String,
}

/// Form data from the add-student form.
#[derive(Debug, Deserialize)]
pub struct StudentForm {
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub csrf_token: String,
}
