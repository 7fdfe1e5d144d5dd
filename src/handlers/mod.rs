pub mod account_handlers;
pub mod attendance_handlers;
pub mod auth_handlers;
pub mod billing_handlers;
pub mod dashboard;
pub mod portal_handlers;
pub mod scan_handlers;
pub mod settings_handlers;
pub mod student_handlers;

use serde_json::json;

/// Standardized JSON failure body: `{"success": false, "message": …}`.
pub(crate) fn json_failure(status: actix_web::http::StatusCode, message: &str) -> actix_web::HttpResponse {
    actix_web::HttpResponse::build(status).json(json!({ "success": false, "message": message }))
}
