use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use messmate::auth::{self, rate_limit::RateLimiter};
use messmate::db;
use messmate::handlers;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Ensure data directory exists
    std::fs::create_dir_all("data").expect("Failed to create data directory");

    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "data/messmate.db".to_string());
    let pool = db::init_pool(&database_path);
    db::run_migrations(&pool);

    // Seed default mess + admin account if the database is empty
    let admin_hash = auth::password::hash_password("admin123")
        .expect("Failed to hash default password");
    db::seed_defaults(&pool, &admin_hash);

    // Session encryption key — load from SESSION_KEY env var for persistent sessions across restarts
    let secret_key = match std::env::var("SESSION_KEY") {
        Ok(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Ok(val) => {
            log::warn!(
                "SESSION_KEY too short ({} bytes, need 64+) — generating random key",
                val.len()
            );
            Key::generate()
        }
        Err(_) => {
            log::warn!("No SESSION_KEY set — generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let limiter = RateLimiter::new();
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        let session_mw =
            SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                .cookie_secure(false)
                .cookie_http_only(true)
                .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(limiter.clone()))
            // Static files
            .service(actix_files::Files::new("/static", "./static"))
            // Public routes
            .route("/", web::get().to(handlers::auth_handlers::index))
            .route("/login", web::get().to(handlers::auth_handlers::login_page))
            .route("/login", web::post().to(handlers::auth_handlers::login_submit))
            .route("/signup", web::get().to(handlers::auth_handlers::signup_page))
            .route("/signup", web::post().to(handlers::auth_handlers::signup_submit))
            // Self-scan pages are authorized by the session token alone
            .route("/scan/{token}", web::get().to(handlers::scan_handlers::scan_page))
            .route("/scan/{token}/submit", web::post().to(handlers::scan_handlers::submit))
            // Student portal login
            .route("/portal/login", web::get().to(handlers::portal_handlers::login_page))
            .route("/portal/login", web::post().to(handlers::portal_handlers::login_submit))
            // Student portal (protected)
            .service(
                web::scope("/portal")
                    .wrap(actix_web::middleware::from_fn(auth::middleware::require_student))
                    .route("/logout", web::post().to(handlers::portal_handlers::logout))
                    .route("/dashboard", web::get().to(handlers::portal_handlers::dashboard))
                    .route("/attendance", web::get().to(handlers::portal_handlers::attendance_page))
                    .route("/bills", web::get().to(handlers::portal_handlers::bills_page))
                    .route("/bills/{id}/upi-link", web::post().to(handlers::portal_handlers::upi_link))
                    .route("/bills/{id}/pay", web::post().to(handlers::portal_handlers::initiate_payment))
                    .route("/bills/{id}/payments", web::get().to(handlers::portal_handlers::bill_payments))
                    .route("/profile", web::get().to(handlers::portal_handlers::profile_form))
                    .route("/profile", web::post().to(handlers::portal_handlers::profile_submit)),
            )
            // Admin routes
            .service(
                web::scope("")
                    .wrap(actix_web::middleware::from_fn(auth::middleware::require_auth))
                    .route("/dashboard", web::get().to(handlers::dashboard::index))
                    .route("/logout", web::post().to(handlers::auth_handlers::logout))
                    // Student roster — /students/new BEFORE /students/{id} to avoid routing conflict
                    .route("/students", web::get().to(handlers::student_handlers::list))
                    .route("/students/new", web::get().to(handlers::student_handlers::new_form))
                    .route("/students", web::post().to(handlers::student_handlers::create))
                    .route("/students/{id}", web::post().to(handlers::student_handlers::update))
                    .route("/students/{id}/delete", web::post().to(handlers::student_handlers::delete))
                    .route("/students/{id}/reset-password", web::post().to(handlers::student_handlers::reset_password))
                    .route("/students/{id}/badge", web::get().to(handlers::student_handlers::badge))
                    // Attendance
                    .route("/attendance", web::get().to(handlers::attendance_handlers::page))
                    .route("/attendance", web::post().to(handlers::attendance_handlers::manual_mark))
                    .route("/attendance/mark", web::post().to(handlers::attendance_handlers::mark))
                    .route("/attendance/export", web::get().to(handlers::attendance_handlers::export))
                    .route("/attendance/sessions", web::post().to(handlers::scan_handlers::create_session))
                    .route("/attendance/sessions/active", web::get().to(handlers::scan_handlers::active_sessions))
                    .route("/attendance/sessions/{id}/close", web::post().to(handlers::scan_handlers::close_session))
                    .route("/attendance/{id}/update", web::post().to(handlers::attendance_handlers::update))
                    .route("/attendance/{id}/delete", web::post().to(handlers::attendance_handlers::delete))
                    // Billing
                    .route("/billing", web::get().to(handlers::billing_handlers::page))
                    .route("/billing/generate", web::post().to(handlers::billing_handlers::generate))
                    .route("/bills/{id}", web::get().to(handlers::billing_handlers::detail))
                    .route("/bills/{id}/payments", web::get().to(handlers::billing_handlers::bill_payments))
                    .route("/bills/{id}/mark-paid", web::post().to(handlers::billing_handlers::mark_paid))
                    .route("/bills/{id}/delete", web::post().to(handlers::billing_handlers::delete))
                    .route("/payments/{id}/update", web::post().to(handlers::billing_handlers::payment_update))
                    // Settings & account
                    .route("/settings", web::get().to(handlers::settings_handlers::form))
                    .route("/settings", web::post().to(handlers::settings_handlers::save))
                    .route("/profile", web::get().to(handlers::account_handlers::form))
                    .route("/profile", web::post().to(handlers::account_handlers::submit)),
            )
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                let html = include_str!("../templates/errors/404.html");
                actix_web::HttpResponse::NotFound()
                    .content_type("text/html; charset=utf-8")
                    .body(html)
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
