use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::auth::csrf;
use crate::auth::session::{require_admin, set_flash};
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::models::{mess, setting};
use crate::templates_structs::{PageContext, SettingsTemplate};

#[derive(Deserialize)]
pub struct SettingsForm {
    pub daily_meal_rate: String,
    #[serde(default)]
    pub upi_id: String,
    #[serde(default)]
    pub upi_name: String,
    pub csrf_token: String,
}

pub async fn form(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PageContext::build(&session, &conn, "/settings")?;

    let daily_meal_rate = mess::effective_daily_rate(&conn, ctx.mess_id);
    let (upi_id, upi_name) = mess::effective_upi(&conn, ctx.mess_id);

    let tmpl = SettingsTemplate {
        ctx,
        daily_meal_rate: format!("{daily_meal_rate}"),
        upi_id,
        upi_name,
    };
    render(tmpl)
}

/// Save billing and UPI settings on the mess, keeping the key/value
/// fallbacks in sync for legacy single-mess installs.
pub async fn save(
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<SettingsForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let rate: f64 = form.daily_meal_rate.trim().parse().unwrap_or(0.0);
    if rate <= 0.0 {
        set_flash(&session, "Daily meal rate must be a positive number");
        return Ok(redirect());
    }

    let upi_id = form.upi_id.trim();
    let upi_name = form.upi_name.trim();
    mess::update_config(&conn, admin.mess_id, rate, upi_id, upi_name)?;

    setting::set_value(&conn, "daily_meal_rate", &rate.to_string(), Some("Daily rate for 2 meals"))?;
    if !upi_id.is_empty() {
        setting::set_value(&conn, "upi_id", upi_id, Some("UPI ID for receiving payments"))?;
    }
    if !upi_name.is_empty() {
        setting::set_value(&conn, "upi_name", upi_name, Some("Business name shown in UPI apps"))?;
    }

    set_flash(&session, "Settings updated successfully!");
    Ok(redirect())
}

fn redirect() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", "/settings"))
        .finish()
}
