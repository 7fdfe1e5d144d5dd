use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use rusqlite::{OptionalExtension, params};
use serde::Deserialize;

use crate::auth::rate_limit::RateLimiter;
use crate::auth::session::{login_admin, set_flash};
use crate::auth::{csrf, password};
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::models::mess;
use crate::templates_structs::{IndexTemplate, LoginTemplate, SignupTemplate};

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct SignupForm {
    pub mess_name: String,
    pub admin_username: String,
    pub admin_password: String,
    pub daily_meal_rate: String,
    #[serde(default)]
    pub upi_id: String,
    #[serde(default)]
    pub upi_name: String,
    pub csrf_token: String,
}

struct AdminRow {
    id: i64,
    username: String,
    password_hash: String,
    mess_id: i64,
}

fn find_admin(conn: &rusqlite::Connection, username: &str) -> rusqlite::Result<Option<AdminRow>> {
    conn.query_row(
        "SELECT id, username, password_hash, COALESCE(mess_id, 0) FROM users \
         WHERE username = ?1 AND is_admin = 1",
        params![username],
        |row| {
            Ok(AdminRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                mess_id: row.get(3)?,
            })
        },
    )
    .optional()
}

pub async fn index() -> Result<HttpResponse, AppError> {
    render(IndexTemplate)
}

pub async fn login_page(session: Session) -> Result<HttpResponse, AppError> {
    // If already logged in, go straight to the dashboard
    if crate::auth::session::get_user_id(&session).is_some() {
        return Ok(HttpResponse::SeeOther()
            .insert_header(("Location", "/dashboard"))
            .finish());
    }
    let csrf_token = csrf::get_or_create_token(&session);
    render(LoginTemplate { error: None, csrf_token })
}

pub async fn login_submit(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<LoginForm>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;

    let ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

    let login_error = |message: &str, session: &Session| {
        let csrf_token = csrf::get_or_create_token(session);
        render(LoginTemplate { error: Some(message.to_string()), csrf_token })
    };

    if limiter.is_blocked(ip) {
        return login_error("Too many failed login attempts. Please try again later.", &session);
    }

    let conn = pool.get()?;
    let found = find_admin(&conn, form.username.trim())?;

    match found {
        Some(user)
            if password::verify_password(&form.password, &user.password_hash)
                .unwrap_or(false) =>
        {
            limiter.clear(ip);
            login_admin(&session, user.id, &user.username, user.mess_id);
            Ok(HttpResponse::SeeOther()
                .insert_header(("Location", "/dashboard"))
                .finish())
        }
        _ => {
            limiter.record_failure(ip);
            login_error("Invalid username or password", &session)
        }
    }
}

pub async fn signup_page(session: Session) -> Result<HttpResponse, AppError> {
    if crate::auth::session::get_user_id(&session).is_some() {
        return Ok(HttpResponse::SeeOther()
            .insert_header(("Location", "/dashboard"))
            .finish());
    }
    let csrf_token = csrf::get_or_create_token(&session);
    render(SignupTemplate { errors: vec![], csrf_token })
}

/// Register a new mess together with its first admin account.
pub async fn signup_submit(
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;

    let conn = pool.get()?;

    let mess_name = form.mess_name.trim();
    let admin_username = form.admin_username.trim();

    let mut errors = vec![];
    if mess_name.is_empty() {
        errors.push("Mess name is required.".to_string());
    }
    if admin_username.is_empty() {
        errors.push("Admin username is required.".to_string());
    }
    if form.admin_password.len() < 6 {
        errors.push("Admin password must be at least 6 characters.".to_string());
    }
    if !mess_name.is_empty() && mess::name_taken(&conn, mess_name)? {
        errors.push("Mess name already exists.".to_string());
    }
    let username_taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![admin_username],
        |row| row.get(0),
    )?;
    if username_taken {
        errors.push("Admin username already taken.".to_string());
    }

    let daily_meal_rate: f64 = form.daily_meal_rate.trim().parse().unwrap_or(0.0);
    if daily_meal_rate <= 0.0 {
        errors.push("Daily meal rate must be a positive number.".to_string());
    }

    if !errors.is_empty() {
        let csrf_token = csrf::get_or_create_token(&session);
        return render(SignupTemplate { errors, csrf_token });
    }

    let hashed = password::hash_password(&form.admin_password)
        .map_err(|_| AppError::Hash("Password hash error".to_string()))?;

    let upi_id = form.upi_id.trim();
    let upi_name = form.upi_name.trim();
    let mess_id = mess::create(
        &conn,
        mess_name,
        daily_meal_rate,
        (!upi_id.is_empty()).then_some(upi_id),
        (!upi_name.is_empty()).then_some(upi_name),
    )?;

    conn.execute(
        "INSERT INTO users (username, password_hash, is_admin, mess_id) VALUES (?1, ?2, 1, ?3)",
        params![admin_username, hashed, mess_id],
    )?;
    let user_id = conn.last_insert_rowid();

    log::info!("Registered mess '{}' (id={}) with admin '{}'", mess_name, mess_id, admin_username);

    login_admin(&session, user_id, admin_username, mess_id);
    set_flash(&session, "Mess created and admin account registered successfully!");
    Ok(HttpResponse::SeeOther()
        .insert_header(("Location", "/dashboard"))
        .finish())
}

pub async fn logout(
    session: Session,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    session.purge();
    Ok(HttpResponse::SeeOther()
        .insert_header(("Location", "/login"))
        .finish())
}
