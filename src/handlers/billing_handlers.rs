use actix_session::Session;
use actix_web::{HttpResponse, http::StatusCode, web};
use chrono::{Datelike, Local};
use serde::Deserialize;
use serde_json::json;

use crate::auth::csrf;
use crate::auth::session::require_admin;
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::handlers::json_failure;
use crate::handlers::student_handlers::CsrfBody;
use crate::models::{attendance, bill, mess, payment, student};
use crate::templates_structs::{BillView, BillingTemplate, PageContext};

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown")
}

pub async fn page(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PageContext::build(&session, &conn, "/billing")?;

    let bills = bill::find_by_mess(&conn, ctx.mess_id)?;
    let total_amount: f64 = bills.iter().map(|b| b.amount).sum();
    let paid_amount: f64 = bills.iter().filter(|b| b.paid).map(|b| b.amount).sum();
    let pending_amount = total_amount - paid_amount;

    let mut views = Vec::with_capacity(bills.len());
    for b in bills {
        let status = bill::payment_status(&conn, &b)?;
        views.push(BillView { bill: b, status });
    }

    let students = student::find_all_by_mess(&conn, ctx.mess_id)?;
    let now = Local::now();

    let tmpl = BillingTemplate {
        ctx,
        bills: views,
        students,
        current_month: now.month(),
        current_year: now.year(),
        total_amount,
        paid_amount,
        pending_amount,
    };
    render(tmpl)
}

#[derive(Deserialize)]
pub struct GenerateBody {
    pub student_id: String,
    pub month: String,
    pub year: String,
    pub csrf_token: String,
}

/// Generate a month's bill from the attendance count: meals × (daily rate / 2).
pub async fn generate(
    pool: web::Data<DbPool>,
    session: Session,
    body: web::Json<GenerateBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let (Ok(student_id), Ok(month), Ok(year)) = (
        body.student_id.trim().parse::<i64>(),
        body.month.trim().parse::<u32>(),
        body.year.trim().parse::<i32>(),
    ) else {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Invalid input values"));
    };
    if !(1..=12).contains(&month) {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Invalid input values"));
    }

    let Some(target) =
        student::find_by_id(&conn, student_id)?.filter(|s| s.mess_id == admin.mess_id)
    else {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Student not found"));
    };

    if bill::exists(&conn, student_id, month, year)? {
        return Ok(json_failure(
            StatusCode::CONFLICT,
            &format!("Bill already exists for {} for {}/{}", target.name, month, year),
        ));
    }

    let meals = attendance::count_for_student_month(&conn, student_id, year, month)?;
    if meals == 0 {
        return Ok(json_failure(
            StatusCode::NOT_FOUND,
            &format!("No attendance records found for {} in {}/{}", target.name, month, year),
        ));
    }

    let meal_rate = mess::effective_daily_rate(&conn, admin.mess_id) / 2.0;
    bill::create(&conn, admin.mess_id, student_id, month, year, meals, meal_rate)?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": format!("Bill generated successfully for {}", target.name),
    })))
}

fn owned_bill(
    conn: &rusqlite::Connection,
    id: i64,
    mess_id: i64,
) -> Result<Option<bill::Bill>, AppError> {
    let found = bill::find_by_id(conn, id)?;
    match found {
        Some(b) => {
            let owner = student::find_by_id(conn, b.student_id)?;
            Ok(owner.filter(|s| s.mess_id == mess_id).map(|_| b))
        }
        None => Ok(None),
    }
}

/// Bill detail for the admin's bill dialog.
pub async fn detail(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let Some(b) = owned_bill(&conn, path.into_inner(), admin.mess_id)? else {
        return Err(AppError::NotFound);
    };
    let Some(s) = student::find_by_id(&conn, b.student_id)? else {
        return Err(AppError::NotFound);
    };
    let status = bill::payment_status(&conn, &b)?;
    let payments = payment::find_by_bill(&conn, b.id)?;

    Ok(HttpResponse::Ok().json(json!({
        "id": b.id,
        "student": {
            "name": s.name,
            "roll_no": s.roll_no,
            "department": s.department,
            "contact": s.contact,
            "email": s.email,
        },
        "month": b.month,
        "month_name": month_name(b.month),
        "year": b.year,
        "amount": b.amount,
        "meals_counted": b.meals_counted,
        "meal_rate": b.meal_rate,
        "generated_on": b.generated_on,
        "paid": b.paid,
        "payment_status": status.as_str(),
        "payments": payments,
    })))
}

pub async fn bill_payments(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let Some(b) = owned_bill(&conn, path.into_inner(), admin.mess_id)? else {
        return Err(AppError::NotFound);
    };
    let payments = payment::find_by_bill(&conn, b.id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payments": payments,
        "bill": { "id": b.id, "paid": b.paid },
    })))
}

#[derive(Deserialize)]
pub struct MarkPaidBody {
    pub payment_id: Option<i64>,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub csrf_token: String,
}

/// Settle a bill: verify the referenced submitted payment, or record a
/// manual verified payment for the full amount.
pub async fn mark_paid(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<MarkPaidBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let Some(b) = owned_bill(&conn, path.into_inner(), admin.mess_id)? else {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Bill not found"));
    };
    if b.paid {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Bill is already marked as paid"));
    }

    let now = Local::now().naive_local();

    match body.payment_id {
        Some(payment_id) => {
            let Some(p) = payment::find_by_id(&conn, payment_id)?.filter(|p| p.bill_id == b.id)
            else {
                return Ok(json_failure(
                    StatusCode::BAD_REQUEST,
                    "Invalid payment reference provided.",
                ));
            };
            if p.status == "verified" {
                return Ok(json_failure(StatusCode::BAD_REQUEST, "Payment already verified."));
            }
            payment::verify(&conn, &p, &admin.username, now)?;
        }
        None => {
            let reference = body
                .reference
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| format!("MANUAL-{}", now.format("%Y%m%d%H%M%S")));
            payment::record_manual(
                &conn,
                admin.mess_id,
                b.id,
                b.student_id,
                b.amount,
                body.method.as_deref().unwrap_or("manual"),
                &reference,
                body.notes.as_deref(),
                &admin.username,
                now,
            )?;
            bill::mark_paid(&conn, b.id)?;
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Bill #{} for {} marked as paid", b.id, b.student_name),
    })))
}

pub async fn delete(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<CsrfBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let Some(b) = owned_bill(&conn, path.into_inner(), admin.mess_id)? else {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Bill not found"));
    };
    if b.paid {
        return Ok(json_failure(StatusCode::BAD_REQUEST, "Cannot delete a paid bill"));
    }

    bill::delete(&conn, b.id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Bill for {} ({}/{}) deleted successfully", b.student_name, b.month, b.year),
    })))
}

#[derive(Deserialize)]
pub struct PaymentActionBody {
    pub action: String,
    pub csrf_token: String,
}

/// Verify or reject a submitted payment.
pub async fn payment_update(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<PaymentActionBody>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &body.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let Some(p) = payment::find_by_id(&conn, path.into_inner())? else {
        return Ok(json_failure(StatusCode::NOT_FOUND, "Payment not found"));
    };
    // Tenancy check through the payment's student.
    if student::find_by_id(&conn, p.student_id)?
        .map(|s| s.mess_id != admin.mess_id)
        .unwrap_or(true)
    {
        return Ok(json_failure(StatusCode::FORBIDDEN, "Payment belongs to another mess"));
    }

    let now = Local::now().naive_local();
    let message = match body.action.to_lowercase().as_str() {
        "verify" => {
            let Some(b) = bill::find_by_id(&conn, p.bill_id)? else {
                return Ok(json_failure(StatusCode::NOT_FOUND, "Bill not found"));
            };
            if b.paid {
                return Ok(json_failure(StatusCode::BAD_REQUEST, "Bill is already marked paid."));
            }
            payment::verify(&conn, &p, &admin.username, now)?;
            format!("Payment #{} verified and bill marked as paid.", p.id)
        }
        "reject" => {
            if p.status == "verified" {
                return Ok(json_failure(
                    StatusCode::BAD_REQUEST,
                    "Cannot reject a verified payment.",
                ));
            }
            payment::reject(&conn, p.id, &admin.username, now)?;
            format!("Payment #{} rejected.", p.id)
        }
        _ => return Ok(json_failure(StatusCode::BAD_REQUEST, "Unsupported action.")),
    };

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": message })))
}
