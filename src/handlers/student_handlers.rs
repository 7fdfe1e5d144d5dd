use actix_session::Session;
use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use crate::auth::session::{require_admin, set_flash};
use crate::auth::{csrf, password};
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::handlers::auth_handlers::CsrfOnly;
use crate::handlers::json_failure;
use crate::models::student::{self, NewStudent, Student, StudentForm};
use crate::templates_structs::{PageContext, StudentFormTemplate, StudentListTemplate};

#[derive(Deserialize)]
pub struct PaginationQuery {
    page: Option<i64>,
}

/// Look up a student and confirm it belongs to the admin's mess.
fn owned_student(
    conn: &rusqlite::Connection,
    id: i64,
    mess_id: i64,
) -> Result<Option<Student>, AppError> {
    Ok(student::find_by_id(conn, id)?.filter(|s| s.mess_id == mess_id))
}

pub async fn list(
    pool: web::Data<DbPool>,
    session: Session,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PageContext::build(&session, &conn, "/students")?;
    let page = student::find_page(&conn, ctx.mess_id, query.page.unwrap_or(1), 50)?;
    render(StudentListTemplate { ctx, page })
}

pub async fn new_form(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PageContext::build(&session, &conn, "/students")?;
    render(StudentFormTemplate { ctx, errors: vec![] })
}

pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<StudentForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let name = form.name.trim();
    let contact = form.contact.trim();

    let mut errors = vec![];
    if name.is_empty() {
        errors.push("Name is required".to_string());
    }
    if !contact.is_empty() && !contact.chars().all(|c| c.is_ascii_digit()) {
        errors.push("Contact number should contain only digits".to_string());
    }

    if !errors.is_empty() {
        let ctx = PageContext::build(&session, &conn, "/students")?;
        return render(StudentFormTemplate { ctx, errors });
    }

    let roll_no = student::next_roll_no(&conn)?;
    // Shown exactly once in the flash; the student changes it on first login.
    let temp_password = password::generate_temp_password(10);
    let hashed = password::hash_password(&temp_password)
        .map_err(|_| AppError::Hash("Password hash error".to_string()))?;

    let new = NewStudent {
        name: name.to_string(),
        department: form.department.trim().to_string(),
        contact: contact.to_string(),
        email: form.email.trim().to_string(),
        address: form.address.trim().to_string(),
    };

    match student::create(&conn, &new, &roll_no, &hashed, admin.mess_id) {
        Ok(_) => {
            set_flash(
                &session,
                &format!(
                    "Student added successfully with Roll No: {roll_no}. Initial Password: {temp_password}"
                ),
            );
            Ok(HttpResponse::SeeOther()
                .insert_header(("Location", "/students"))
                .finish())
        }
        Err(e) => {
            let ctx = PageContext::build(&session, &conn, "/students")?;
            render(StudentFormTemplate {
                ctx,
                errors: vec![format!("Error adding student: {e}")],
            })
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateStudentBody {
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub csrf_token: String,
}

/// Inline roster edit; answers JSON for the edit dialog.
pub async fn update(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<UpdateStudentBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let id = path.into_inner();
    let conn = pool.get()?;

    if owned_student(&conn, id, admin.mess_id)?.is_none() {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Student not found"));
    }
    let name = body.name.trim();
    if name.is_empty() {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Name is required"));
    }

    student::update_details(
        &conn,
        id,
        name,
        body.contact.trim(),
        body.email.trim(),
        body.address.trim(),
    )?;
    log::info!("Student {} updated by {}", id, admin.username);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Student updated successfully",
        "student": {
            "id": id,
            "name": name,
            "contact": body.contact.trim(),
            "email": body.email.trim(),
            "address": body.address.trim(),
        }
    })))
}

pub async fn delete(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let admin = require_admin(&session)?;
    let id = path.into_inner();
    let conn = pool.get()?;

    let Some(target) = owned_student(&conn, id, admin.mess_id)? else {
        set_flash(&session, "Student not found");
        return Ok(HttpResponse::SeeOther()
            .insert_header(("Location", "/students"))
            .finish());
    };

    match student::delete(&conn, id) {
        Ok(()) => set_flash(
            &session,
            &format!("Student {} and all associated records deleted successfully", target.name),
        ),
        Err(e) => {
            log::error!("Error deleting student {id}: {e}");
            set_flash(&session, &format!("Error deleting student: {e}"));
        }
    }
    Ok(HttpResponse::SeeOther()
        .insert_header(("Location", "/students"))
        .finish())
}

#[derive(Deserialize)]
pub struct CsrfBody {
    pub csrf_token: String,
}

/// Generate a new temporary portal password and hand it back once.
pub async fn reset_password(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<CsrfBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let id = path.into_inner();
    let conn = pool.get()?;

    let Some(target) = owned_student(&conn, id, admin.mess_id)? else {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Student not found"));
    };

    let new_password = password::generate_temp_password(10);
    let hashed = password::hash_password(&new_password)
        .map_err(|_| AppError::Hash("Password hash error".to_string()))?;
    student::set_password_hash(&conn, id, &hashed)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Password reset for {}", target.name),
        "password": new_password,
    })))
}

/// The text payload a printed badge QR encodes. The scanner-side decoder
/// only requires `student_id` and `name`; everything else is ignored.
pub async fn badge(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let admin = require_admin(&session)?;
    let id = path.into_inner();
    let conn = pool.get()?;

    let Some(target) = owned_student(&conn, id, admin.mess_id)? else {
        return Err(AppError::NotFound);
    };

    Ok(HttpResponse::Ok().json(json!({
        "student_id": target.id.to_string(),
        "name": target.name,
        "issued_at": Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
    })))
}
