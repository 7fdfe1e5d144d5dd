use actix_session::Session;
use actix_web::{HttpResponse, web};
use rusqlite::params;
use serde::Deserialize;

use crate::auth::session::{require_admin, set_flash};
use crate::auth::{csrf, password};
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::templates_structs::{PageContext, ProfileTemplate};

#[derive(Deserialize)]
pub struct ProfileForm {
    pub action: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub csrf_token: String,
}

pub async fn form(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let ctx = PageContext::build(&session, &conn, "/profile")?;
    render(ProfileTemplate { ctx, errors: vec![] })
}

pub async fn submit(
    pool: web::Data<DbPool>,
    session: Session,
    form: web::Form<ProfileForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let admin = require_admin(&session)?;
    let conn = pool.get()?;

    let mut errors = vec![];

    match form.action.as_str() {
        "change_password" => {
            let stored: String = conn.query_row(
                "SELECT password_hash FROM users WHERE id = ?1",
                params![admin.user_id],
                |row| row.get(0),
            )?;
            if !password::verify_password(&form.current_password, &stored).unwrap_or(false) {
                errors.push("Current password is incorrect".to_string());
            }
            if form.new_password.len() < 6 {
                errors.push("New password must be at least 6 characters".to_string());
            }
            if form.new_password != form.confirm_password {
                errors.push("New passwords do not match".to_string());
            }
            if errors.is_empty() {
                let hashed = password::hash_password(&form.new_password)
                    .map_err(|_| AppError::Hash("Password hash error".to_string()))?;
                conn.execute(
                    "UPDATE users SET password_hash = ?2 WHERE id = ?1",
                    params![admin.user_id, hashed],
                )?;
                set_flash(&session, "Password changed successfully!");
                return Ok(HttpResponse::SeeOther()
                    .insert_header(("Location", "/profile"))
                    .finish());
            }
        }
        "update_info" => {
            let new_username = form.username.trim();
            if new_username.is_empty() {
                errors.push("Username is required".to_string());
            } else if new_username != admin.username {
                let taken: bool = conn.query_row(
                    "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
                    params![new_username],
                    |row| row.get(0),
                )?;
                if taken {
                    errors.push("Username already taken".to_string());
                } else {
                    conn.execute(
                        "UPDATE users SET username = ?2 WHERE id = ?1",
                        params![admin.user_id, new_username],
                    )?;
                    let _ = session.insert("username", new_username);
                    set_flash(&session, "Profile updated successfully!");
                    return Ok(HttpResponse::SeeOther()
                        .insert_header(("Location", "/profile"))
                        .finish());
                }
            }
        }
        _ => errors.push("Unknown action".to_string()),
    }

    let ctx = PageContext::build(&session, &conn, "/profile")?;
    render(ProfileTemplate { ctx, errors })
}
