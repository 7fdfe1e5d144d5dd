use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use chrono::{Local, Timelike};
use serde::Deserialize;
use serde_json::json;

use crate::auth::csrf;
use crate::auth::session::require_admin;
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::handlers::json_failure;
use crate::handlers::student_handlers::CsrfBody;
use crate::models::attendance::{self, MealType, NewAttendance};
use crate::models::{scan_session, student};
use crate::templates_structs::{ScanErrorTemplate, ScanPageTemplate};

const DEFAULT_DURATION_MINUTES: i64 = 120;

fn scan_url(req: &HttpRequest, token: &str) -> String {
    let info = req.connection_info();
    format!("{}://{}/scan/{}", info.scheme(), info.host(), token)
}

#[derive(Deserialize)]
pub struct CreateSessionBody {
    pub meal_type: Option<String>,
    pub duration: Option<i64>,
    pub csrf_token: String,
}

/// Open a self-scan window for the current (or given) meal.
pub async fn create_session(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<CreateSessionBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let now = Local::now();
    let meal = body
        .meal_type
        .as_deref()
        .and_then(MealType::parse)
        .unwrap_or_else(|| MealType::for_hour(now.hour()));
    let duration = body.duration.unwrap_or(DEFAULT_DURATION_MINUTES).clamp(5, 24 * 60);

    let (id, token) = scan_session::create(
        &conn,
        admin.mess_id,
        now.date_naive(),
        meal,
        &admin.username,
        duration,
        now.naive_local(),
    )?;
    let Some((created, _)) = scan_session::find_by_id(&conn, id)? else {
        return Err(AppError::NotFound);
    };

    log::info!("Scan session {} opened for {} by {}", id, meal.as_str(), admin.username);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Session created for {}", meal.as_str()),
        "session": created,
        "scan_url": scan_url(&req, &token),
    })))
}

/// Today's open sessions, with their shareable URLs.
pub async fn active_sessions(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let sessions = scan_session::find_active(&conn, admin.mess_id, Local::now().date_naive())?;
    let payload: Vec<_> = sessions
        .iter()
        .map(|s| {
            json!({
                "session": s,
                "scan_url": scan_url(&req, &s.token),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "success": true, "sessions": payload })))
}

pub async fn close_session(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<CsrfBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let id = path.into_inner();
    let conn = pool.get()?;

    let Some((_, mess_id)) = scan_session::find_by_id(&conn, id)? else {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Session not found"));
    };
    if mess_id != admin.mess_id {
        return Ok(json_failure(StatusCode::FORBIDDEN, "Session belongs to another mess"));
    }

    scan_session::close(&conn, id)?;
    Ok(HttpResponse::Ok()
        .json(json!({ "success": true, "message": "Session closed successfully" })))
}

/// Public page behind a session token: students pick themselves (or scan
/// their badge) to mark attendance for the session's date and meal.
pub async fn scan_page(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let conn = pool.get()?;

    let Some(scan) = scan_session::find_by_token(&conn, &token)? else {
        return render(ScanErrorTemplate { message: "Invalid QR code".to_string() });
    };
    if !scan.is_valid(Local::now().naive_local()) {
        return render(ScanErrorTemplate { message: "This session has expired".to_string() });
    }

    let Some((_, mess_id)) = scan_session::find_by_id(&conn, scan.id)? else {
        return Err(AppError::NotFound);
    };
    let students = student::find_all_by_mess(&conn, mess_id)?;
    let logged_in_student_id = crate::auth::session::get_student_id(&session);

    render(ScanPageTemplate { session: scan, students, logged_in_student_id })
}

#[derive(Deserialize)]
pub struct SubmitBody {
    pub student_id: String,
}

/// Attendance submission from the public scan page. The token itself is
/// the authorization; no login or CSRF token is involved.
pub async fn submit(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    body: web::Json<SubmitBody>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let conn = pool.get()?;

    let now = Local::now().naive_local();
    let Some(scan) = scan_session::find_by_token(&conn, &token)?.filter(|s| s.is_valid(now))
    else {
        return Ok(HttpResponse::Ok()
            .json(json!({ "success": false, "message": "Session expired or invalid" })));
    };

    let Ok(student_id) = body.student_id.trim().parse::<i64>() else {
        return Ok(HttpResponse::Ok()
            .json(json!({ "success": false, "message": "Please select your name" })));
    };
    let Some(target) = student::find_by_id(&conn, student_id)? else {
        return Ok(HttpResponse::Ok()
            .json(json!({ "success": false, "message": "Student not found" })));
    };

    let date = scan.date_parsed();
    if attendance::exists(&conn, student_id, date, scan.meal_type)? {
        return Ok(HttpResponse::Ok().json(json!({
            "success": false,
            "message": format!("You have already marked attendance for {}", scan.meal_type.as_str()),
        })));
    }

    attendance::mark(
        &conn,
        &NewAttendance {
            student_id,
            date,
            meal_type: scan.meal_type,
            method: "qr_scan",
            marked_by: &target.name,
            session_id: Some(scan.id),
        },
        now,
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Attendance marked successfully for {}!", target.name),
    })))
}
