use actix_session::Session;

use crate::errors::AppError;

/// Identity of the logged-in admin, as stored in the cookie session.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub user_id: i64,
    pub username: String,
    pub mess_id: i64,
}

pub fn login_admin(session: &Session, user_id: i64, username: &str, mess_id: i64) {
    let _ = session.insert("user_id", user_id);
    let _ = session.insert("username", username);
    let _ = session.insert("mess_id", mess_id);
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>("user_id").unwrap_or(None)
}

/// Read the full admin identity; errors if any part of it is missing.
pub fn require_admin(session: &Session) -> Result<AdminIdentity, AppError> {
    let user_id = get_user_id(session)
        .ok_or_else(|| AppError::Session("No user in session".to_string()))?;
    let username = session
        .get::<String>("username")
        .unwrap_or(None)
        .ok_or_else(|| AppError::Session("No username in session".to_string()))?;
    let mess_id = session
        .get::<i64>("mess_id")
        .unwrap_or(None)
        .ok_or_else(|| AppError::Session("No mess in session".to_string()))?;
    Ok(AdminIdentity { user_id, username, mess_id })
}

// The student portal uses distinct session keys so an admin and a student
// login in the same browser do not clobber each other.

pub fn login_student(session: &Session, student_id: i64, name: &str) {
    let _ = session.insert("student_id", student_id);
    let _ = session.insert("student_name", name);
}

pub fn get_student_id(session: &Session) -> Option<i64> {
    session.get::<i64>("student_id").unwrap_or(None)
}

pub fn require_student(session: &Session) -> Result<(i64, String), AppError> {
    let id = get_student_id(session)
        .ok_or_else(|| AppError::Session("No student in session".to_string()))?;
    let name = session
        .get::<String>("student_name")
        .unwrap_or(None)
        .ok_or_else(|| AppError::Session("No student name in session".to_string()))?;
    Ok((id, name))
}

pub fn logout_student(session: &Session) {
    session.remove("student_id");
    session.remove("student_name");
}

pub fn take_flash(session: &Session) -> Option<String> {
    let flash = session.get::<String>("flash").unwrap_or(None);
    if flash.is_some() {
        session.remove("flash");
    }
    flash
}

pub fn set_flash(session: &Session, message: &str) {
    let _ = session.insert("flash", message);
}
