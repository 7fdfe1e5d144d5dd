use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use crate::auth::rate_limit::RateLimiter;
use crate::auth::session::{login_student, logout_student, require_student, set_flash};
use crate::auth::{csrf, password};
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::handlers::billing_handlers::month_name;
use crate::handlers::json_failure;
use crate::handlers::auth_handlers::CsrfOnly;
use crate::handlers::student_handlers::CsrfBody;
use crate::models::attendance::{self, MealType};
use crate::models::{bill, mess, payment, student};
use crate::templates_structs::{
    CalendarDay, PortalAttendanceTemplate, PortalBillView, PortalBillsTemplate, PortalContext,
    PortalDashboardTemplate, PortalLoginTemplate, PortalProfileTemplate,
};
use crate::upi;

#[derive(Deserialize)]
pub struct PortalLoginForm {
    pub roll_no: String,
    pub password: String,
    pub csrf_token: String,
}

pub async fn login_page(session: Session) -> Result<HttpResponse, AppError> {
    if crate::auth::session::get_student_id(&session).is_some() {
        return Ok(redirect("/portal/dashboard"));
    }
    let csrf_token = csrf::get_or_create_token(&session);
    render(PortalLoginTemplate { error: None, csrf_token })
}

pub async fn login_submit(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<PortalLoginForm>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;

    let ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

    let login_error = |message: &str, session: &Session| {
        let csrf_token = csrf::get_or_create_token(session);
        render(PortalLoginTemplate { error: Some(message.to_string()), csrf_token })
    };

    if limiter.is_blocked(ip) {
        return login_error("Too many failed login attempts. Please try again later.", &session);
    }

    let conn = pool.get()?;
    let found = student::find_by_roll_no(&conn, form.roll_no.trim())?;

    match found {
        Some(s)
            if s.password_hash
                .as_deref()
                .map(|h| password::verify_password(&form.password, h).unwrap_or(false))
                .unwrap_or(false) =>
        {
            limiter.clear(ip);
            login_student(&session, s.id, &s.name);

            // Welcome flash reflecting what needs the student's attention.
            let rejected = payment::count_by_student_status(&conn, s.id, "rejected")?;
            let submitted = payment::count_by_student_status(&conn, s.id, "submitted")?;
            let unpaid: i64 = conn.query_row(
                "SELECT COUNT(*) FROM bills WHERE student_id = ?1 AND paid = 0",
                rusqlite::params![s.id],
                |row| row.get(0),
            )?;
            let flash = if rejected > 0 {
                format!(
                    "Welcome back, {}! You have {} rejected payment(s) that need resubmission.",
                    s.name, rejected
                )
            } else if submitted > 0 {
                format!(
                    "Welcome back, {}! You have {} payment(s) awaiting verification.",
                    s.name, submitted
                )
            } else if unpaid > 0 {
                format!("Welcome, {}! You have {} unpaid bill(s).", s.name, unpaid)
            } else {
                format!("Welcome, {}!", s.name)
            };
            set_flash(&session, &flash);
            Ok(redirect("/portal/dashboard"))
        }
        _ => {
            limiter.record_failure(ip);
            login_error("Invalid roll number or password", &session)
        }
    }
}

pub async fn logout(session: Session, form: web::Form<CsrfOnly>) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    logout_student(&session);
    Ok(redirect("/portal/login"))
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location.to_string()))
        .finish()
}

pub async fn dashboard(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PortalContext::build(&session, "/portal/dashboard")?;

    let today = Local::now().date_naive();
    let month_start = today.with_day(1).unwrap_or(today);

    let month_records =
        attendance::find_for_student_in_range(&conn, ctx.student_id, month_start, today, None)?;
    let lunch_count = month_records
        .iter()
        .filter(|r| r.meal_type == MealType::Lunch)
        .count() as i64;
    let dinner_count = month_records.len() as i64 - lunch_count;

    let today_meals =
        attendance::find_for_student_in_range(&conn, ctx.student_id, today, today, None)?;
    let current_bill = bill::find_for_period(&conn, ctx.student_id, today.month(), today.year())?;
    let recent_payments = payment::find_recent_by_student(&conn, ctx.student_id, 3)?;
    let recent_meals = attendance::find_for_student_in_range(
        &conn,
        ctx.student_id,
        today - Duration::days(7),
        today,
        None,
    )?;

    let tmpl = PortalDashboardTemplate {
        ctx,
        month_total: month_records.len() as i64,
        lunch_count,
        dinner_count,
        today_meals,
        current_bill,
        recent_payments,
        recent_meals,
    };
    render(tmpl)
}

#[derive(Deserialize)]
pub struct PortalAttendanceQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(rename = "dateRange")]
    pub date_range: Option<String>,
    #[serde(rename = "mealType")]
    pub meal_type: Option<String>,
}

pub async fn attendance_page(
    pool: web::Data<DbPool>,
    session: Session,
    query: web::Query<PortalAttendanceQuery>,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PortalContext::build(&session, "/portal/attendance")?;

    let today = Local::now().date_naive();
    let month = query.month.filter(|m| (1..=12).contains(m)).unwrap_or(today.month());
    let year = query.year.unwrap_or(today.year());

    // Month grid
    let (first, next_first) = attendance::month_bounds(year, month);
    let last = next_first - Duration::days(1);
    let leading_blanks = first.weekday().num_days_from_monday() as usize;

    let month_records =
        attendance::find_for_student_in_range(&conn, ctx.student_id, first, last, None)?;
    let mut by_date: HashMap<NaiveDate, (bool, bool)> = HashMap::new();
    for r in &month_records {
        let entry = by_date.entry(r.date).or_insert((false, false));
        match r.meal_type {
            MealType::Lunch => entry.0 = true,
            MealType::Dinner => entry.1 = true,
        }
    }

    let days = (1..=last.day())
        .map(|day| {
            let date = NaiveDate::from_ymd_opt(year, month, day)
                .expect("day within the month's length");
            let (has_lunch, has_dinner) = by_date.get(&date).copied().unwrap_or((false, false));
            CalendarDay { day, is_future: date > today, has_lunch, has_dinner }
        })
        .collect();

    let (prev_month, prev_year) = if month == 1 { (12, year - 1) } else { (month - 1, year) };
    let (next_month, next_year) = if month == 12 { (1, year + 1) } else { (month + 1, year) };

    // List view with its own light-weight range presets
    let (list_start, list_end) = match query.date_range.as_deref().unwrap_or("thisMonth") {
        "lastMonth" => {
            let first_of_month = today.with_day(1).unwrap_or(today);
            let end = first_of_month - Duration::days(1);
            (end.with_day(1).unwrap_or(end), end)
        }
        "thisWeek" => (
            today - Duration::days(today.weekday().num_days_from_monday() as i64),
            today,
        ),
        "all" => (today - Duration::days(365), today),
        _ => (today.with_day(1).unwrap_or(today), today),
    };
    let meal = query.meal_type.as_deref().and_then(MealType::parse);
    let records =
        attendance::find_for_student_in_range(&conn, ctx.student_id, list_start, list_end, meal)?;
    let lunch_count =
        records.iter().filter(|r| r.meal_type == MealType::Lunch).count() as i64;
    let dinner_count = records.len() as i64 - lunch_count;

    let tmpl = PortalAttendanceTemplate {
        ctx,
        month_name: month_name(month),
        year,
        leading_blanks,
        days,
        prev_month,
        prev_year,
        next_month,
        next_year,
        records,
        lunch_count,
        dinner_count,
    };
    render(tmpl)
}

pub async fn bills_page(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PortalContext::build(&session, "/portal/bills")?;

    let bills = bill::find_by_student(&conn, ctx.student_id)?;
    let total_amount: f64 = bills.iter().map(|b| b.amount).sum();
    let paid_amount: f64 = bills.iter().filter(|b| b.paid).map(|b| b.amount).sum();

    let mut views = Vec::with_capacity(bills.len());
    let mut pending_verification = 0.0;
    for b in bills {
        let status = bill::payment_status(&conn, &b)?;
        if status == bill::PaymentStatus::PendingVerification {
            pending_verification += b.amount;
        }
        views.push(PortalBillView { bill: b, status });
    }
    let outstanding_amount = (total_amount - paid_amount - pending_verification).max(0.0);

    let recent_payments = payment::find_recent_by_student(&conn, ctx.student_id, 5)?;

    let tmpl = PortalBillsTemplate {
        ctx,
        bills: views,
        total_amount,
        paid_amount,
        outstanding_amount,
        recent_payments,
    };
    render(tmpl)
}

fn owned_bill_for_student(
    conn: &rusqlite::Connection,
    bill_id: i64,
    student_id: i64,
) -> Result<Option<bill::Bill>, AppError> {
    Ok(bill::find_by_id(conn, bill_id)?.filter(|b| b.student_id == student_id))
}

/// UPI deep link for settling a bill through any UPI app.
pub async fn upi_link(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<CsrfBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let (student_id, _) = require_student(&session)?;
    let conn = pool.get()?;

    let Some(b) = owned_bill_for_student(&conn, path.into_inner(), student_id)? else {
        return Ok(json_failure(StatusCode::FORBIDDEN, "Unauthorized"));
    };
    if b.paid {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Bill already paid"));
    }

    let Some(s) = student::find_by_id(&conn, student_id)? else {
        return Err(AppError::NotFound);
    };
    let (upi_id, upi_name) = mess::effective_upi(&conn, s.mess_id);
    let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
    let link = upi::payment_link(&upi_id, &upi_name, b.amount, b.id, s.mess_id, &s.roll_no, &stamp);

    Ok(HttpResponse::Ok().json(json!({ "success": true, "link": link })))
}

#[derive(Deserialize)]
pub struct InitiatePaymentBody {
    pub amount: f64,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub reference: String,
    pub notes: Option<String>,
    pub csrf_token: String,
}

/// Submit a payment for admin verification.
pub async fn initiate_payment(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<InitiatePaymentBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let (student_id, _) = require_student(&session)?;
    let conn = pool.get()?;

    let Some(b) = owned_bill_for_student(&conn, path.into_inner(), student_id)? else {
        return Ok(json_failure(StatusCode::FORBIDDEN, "You are not authorized to pay this bill."));
    };
    if b.paid {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Bill is already marked as paid."));
    }

    if body.amount <= 0.0 || body.amount > b.amount {
        return Ok(json_failure(
            StatusCode::BAD_REQUEST,
            "Payment amount must be greater than 0 and no more than the bill total.",
        ));
    }

    let method = body.method.trim().to_lowercase();
    if !method.is_empty() && !payment::ALLOWED_METHODS.contains(&method.as_str()) {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Unsupported payment method."));
    }

    if payment::has_submitted(&conn, b.id)? {
        return Ok(json_failure(
            StatusCode::BAD_REQUEST,
            "A payment is already pending verification for this bill.",
        ));
    }

    let reference = body.reference.trim();
    if reference.is_empty() {
        return Ok(json_failure(
            StatusCode::BAD_REQUEST,
            "Please provide a transaction reference or UPI ID.",
        ));
    }

    let Some(s) = student::find_by_id(&conn, student_id)? else {
        return Err(AppError::NotFound);
    };
    let method = if method.is_empty() { "upi".to_string() } else { method };
    let notes = body.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let payment_id = payment::submit(
        &conn, s.mess_id, b.id, student_id, body.amount, &method, reference, notes,
    )?;

    let Some(p) = payment::find_by_id(&conn, payment_id)? else {
        return Err(AppError::NotFound);
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Payment submitted for verification. The admin will confirm shortly.",
        "payment": p,
    })))
}

pub async fn bill_payments(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let (student_id, _) = require_student(&session)?;
    let conn = pool.get()?;

    let Some(b) = owned_bill_for_student(&conn, path.into_inner(), student_id)? else {
        return Ok(json_failure(
            StatusCode::FORBIDDEN,
            "You are not authorized to view these payments.",
        ));
    };
    let payments = payment::find_by_bill(&conn, b.id)?;
    Ok(HttpResponse::Ok()
        .json(json!({ "success": true, "payments": payments, "bill_paid": b.paid })))
}

#[derive(Deserialize)]
pub struct PortalProfileForm {
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub csrf_token: String,
}

pub async fn profile_form(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PortalContext::build(&session, "/portal/profile")?;
    let Some(s) = student::find_by_id(&conn, ctx.student_id)? else {
        return Err(AppError::NotFound);
    };
    render(PortalProfileTemplate { ctx, student: s, errors: vec![] })
}

pub async fn profile_submit(
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<PortalProfileForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let (student_id, _) = require_student(&session)?;
    let conn = pool.get()?;

    let Some(s) = student::find_by_id(&conn, student_id)? else {
        return Err(AppError::NotFound);
    };

    if !form.new_password.is_empty() {
        if form.new_password != form.confirm_password {
            let ctx = PortalContext::build(&session, "/portal/profile")?;
            return render(PortalProfileTemplate {
                ctx,
                student: s,
                errors: vec!["Passwords do not match".to_string()],
            });
        }
        let hashed = password::hash_password(&form.new_password)
            .map_err(|_| AppError::Hash("Password hash error".to_string()))?;
        student::set_password_hash(&conn, student_id, &hashed)?;
    }

    student::update_details(
        &conn,
        student_id,
        &s.name,
        form.contact.trim(),
        form.email.trim(),
        form.address.trim(),
    )?;

    set_flash(&session, "Profile updated successfully");
    Ok(redirect("/portal/profile"))
}
