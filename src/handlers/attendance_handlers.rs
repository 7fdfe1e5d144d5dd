use actix_session::Session;
use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::{Local, NaiveDate, Timelike};
use serde::Deserialize;
use serde_json::json;

use crate::auth::csrf;
use crate::auth::session::{require_admin, set_flash};
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::handlers::json_failure;
use crate::handlers::student_handlers::CsrfBody;
use crate::models::attendance::filter::{FilterParams, FilterState};
use crate::models::attendance::{self, MealType, NewAttendance};
use crate::models::student;
use crate::templates_structs::{AttendanceTemplate, PageContext};

/// Decode a URL-encoded string (form data): `+` → space, `%HH` → byte.
fn url_decode(s: &str) -> String {
    let s = s.replace('+', " ");
    let mut out = Vec::with_capacity(s.len());
    let b = s.as_bytes();
    let mut i = 0;
    while i < b.len() {
        if b[i] == b'%' && i + 2 < b.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(b[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_default()
}

/// Parse URL-encoded form body into key-value pairs. Used where a field
/// (the meal-type checkboxes) may repeat, which `web::Form` cannot carry.
fn parse_form_body(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((url_decode(k), url_decode(v)))
        })
        .collect()
}

fn get_field<'a>(params: &'a [(String, String)], key: &str) -> &'a str {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

/// The attendance list page. The query string carries the full filter
/// state; the server filters and sorts authoritatively and the page's
/// controls are re-populated from the same state.
pub async fn page(
    pool: web::Data<DbPool>,
    session: Session,
    query: web::Query<FilterParams>,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;

    // Resolve the filter before the context is built, so a broken custom
    // range surfaces on this render rather than the next one.
    let filter = match FilterState::from_params(&query) {
        Ok(f) => f,
        Err(e) => {
            set_flash(&session, &e.to_string());
            FilterState::default()
        }
    };
    let ctx = PageContext::build(&session, &conn, "/attendance")?;

    let now = Local::now();
    let today = now.date_naive();
    let (start, end) = filter.resolve_range(today);
    let records =
        attendance::find_in_range(&conn, ctx.mess_id, start, end, filter.meal, filter.sort)?;
    let students = student::find_all_by_mess(&conn, ctx.mess_id)?;

    let tmpl = AttendanceTemplate {
        ctx,
        students,
        records,
        filter,
        current_meal: MealType::for_hour(now.hour()).as_str(),
        today: today.format("%Y-%m-%d").to_string(),
    };
    render(tmpl)
}

/// Manual marking from the attendance page form. The meal-type checkboxes
/// repeat, so the body is parsed by hand.
pub async fn manual_mark(
    pool: web::Data<DbPool>,
    session: Session,
    body: String,
) -> Result<HttpResponse, AppError> {
    let params = parse_form_body(&body);
    csrf::validate_csrf(&session, get_field(&params, "csrf_token"))?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let meal_types: Vec<MealType> = params
        .iter()
        .filter(|(k, _)| k == "meal_type")
        .filter_map(|(_, v)| MealType::parse(v))
        .collect();

    if meal_types.is_empty() {
        set_flash(&session, "Please select at least one meal type");
        return Ok(redirect_to_attendance());
    }

    let student_id: i64 = match get_field(&params, "student_id").parse() {
        Ok(id) => id,
        Err(_) => {
            set_flash(&session, "Please select a student");
            return Ok(redirect_to_attendance());
        }
    };

    let now = Local::now().naive_local();
    let date = NaiveDate::parse_from_str(get_field(&params, "date"), "%Y-%m-%d")
        .unwrap_or_else(|_| now.date());

    let mut marked = 0;
    let mut skipped = vec![];
    for meal in meal_types {
        if attendance::exists(&conn, student_id, date, meal)? {
            skipped.push(meal.as_str());
            continue;
        }
        attendance::mark(
            &conn,
            &NewAttendance {
                student_id,
                date,
                meal_type: meal,
                method: "manual",
                marked_by: &admin.username,
                session_id: None,
            },
            now,
        )?;
        marked += 1;
    }

    let mut message = match marked {
        0 => String::new(),
        n => format!("Attendance marked successfully for {n} meal(s)"),
    };
    if !skipped.is_empty() {
        if !message.is_empty() {
            message.push_str("; ");
        }
        message.push_str(&format!("already marked: {}", skipped.join(", ")));
    }
    set_flash(&session, &message);
    Ok(redirect_to_attendance())
}

fn redirect_to_attendance() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", "/attendance"))
        .finish()
}

#[derive(Deserialize)]
pub struct MarkBody {
    pub student_id: String,
    pub meal_type: Option<String>,
    pub method: Option<String>,
    pub csrf_token: String,
}

/// JSON marking endpoint used by the scanner and the quick-mark buttons.
/// The meal type defaults to the hour-of-day inference when absent.
pub async fn mark(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<MarkBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let Ok(student_id) = body.student_id.trim().parse::<i64>() else {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Student ID is required"));
    };
    let Some(target) = student::find_by_id(&conn, student_id)?.filter(|s| s.mess_id == admin.mess_id)
    else {
        return Ok(json_failure(StatusCode::OK, "Student not found"));
    };

    let now = Local::now();
    let meal = body
        .meal_type
        .as_deref()
        .and_then(MealType::parse)
        .unwrap_or_else(|| MealType::for_hour(now.hour()));
    let method = match body.method.as_deref() {
        Some("qr") => "qr",
        _ => "manual",
    };

    let today = now.date_naive();
    if attendance::exists(&conn, student_id, today, meal)? {
        return Ok(HttpResponse::Ok().json(json!({
            "success": false,
            "message": format!("Attendance for {} already marked", meal.as_str()),
        })));
    }

    attendance::mark(
        &conn,
        &NewAttendance {
            student_id,
            date: today,
            meal_type: meal,
            method,
            marked_by: &admin.username,
            session_id: None,
        },
        now.naive_local(),
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Attendance marked successfully for {}", target.name),
    })))
}

#[derive(Deserialize)]
pub struct UpdateBody {
    pub date: Option<String>,
    pub meal_type: Option<String>,
    pub csrf_token: String,
}

/// Move a record to a different date and/or meal, with a duplicate check.
pub async fn update(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<UpdateBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let id = path.into_inner();
    let conn = pool.get()?;

    let Some(record) = attendance::find_by_id(&conn, id)? else {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Attendance record not found"));
    };
    if student::find_by_id(&conn, record.student_id)?
        .map(|s| s.mess_id != admin.mess_id)
        .unwrap_or(true)
    {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Attendance record not found"));
    }

    let new_date = match body.date.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => return Ok(json_failure(StatusCode::BAD_REQUEST, "Invalid date format")),
        },
        None => record.date,
    };
    let new_meal = match body.meal_type.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => match MealType::parse(s) {
            Some(m) => m,
            None => return Ok(json_failure(StatusCode::BAD_REQUEST, "Invalid meal type")),
        },
        None => record.meal_type,
    };

    if new_date == record.date && new_meal == record.meal_type {
        return Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "message": "No changes detected" })));
    }

    if attendance::duplicate_exists(&conn, record.student_id, new_date, new_meal, id)? {
        return Ok(json_failure(
            StatusCode::CONFLICT,
            &format!(
                "Attendance already exists for {} on {} ({})",
                record.student_name,
                new_date.format("%Y-%m-%d"),
                new_meal.as_str()
            ),
        ));
    }

    attendance::update(&conn, id, new_date, new_meal, Local::now().naive_local())?;

    Ok(HttpResponse::Ok()
        .json(json!({ "success": true, "message": "Attendance updated successfully" })))
}

pub async fn delete(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<CsrfBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let id = path.into_inner();
    let conn = pool.get()?;

    let Some(record) = attendance::find_by_id(&conn, id)? else {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Attendance record not found"));
    };
    if student::find_by_id(&conn, record.student_id)?
        .map(|s| s.mess_id != admin.mess_id)
        .unwrap_or(true)
    {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Attendance record not found"));
    }

    attendance::delete(&conn, id)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!(
            "Deleted {}'s {} attendance for {}",
            record.student_name,
            record.meal_type.as_str(),
            record.date.format("%Y-%m-%d")
        ),
    })))
}

/// CSV export of the current filter selection.
pub async fn export(
    pool: web::Data<DbPool>,
    session: Session,
    query: web::Query<FilterParams>,
) -> Result<HttpResponse, AppError> {
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let filter = FilterState::from_params(&query).unwrap_or_default();
    let today = Local::now().date_naive();
    let (start, end) = filter.resolve_range(today);

    let records =
        attendance::find_in_range(&conn, admin.mess_id, start, end, filter.meal, filter.sort)?;

    let mut csv = String::from("Date,Time,Student ID,Student Name,Meal,Method,Marked By\n");
    for r in &records {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            r.date.format("%Y-%m-%d"),
            r.timestamp.format("%H:%M:%S"),
            r.student_id,
            csv_escape(&r.student_name),
            r.meal_type.label(),
            r.method,
            csv_escape(&r.marked_by),
        ));
    }

    let filename = format!(
        "attendance_{}_to_{}.csv",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(csv))
}

/// Quote a CSV field when it contains a delimiter or quote.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
