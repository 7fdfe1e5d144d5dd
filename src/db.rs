use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub type DbPool = Pool<SqliteConnectionManager>;

pub const MIGRATIONS: &str = include_str!("schema.sql");

pub fn init_pool(database_path: &str) -> DbPool {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(())
    });
    Pool::builder()
        .max_size(8)
        .build(manager)
        .expect("Failed to create DB pool")
}

pub fn run_migrations(pool: &DbPool) {
    let conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.execute_batch(MIGRATIONS)
        .expect("Failed to run migrations");
    log::info!("Database migrations complete");
}

/// Seed the default mess, admin account and fallback settings on first run.
/// Idempotent: skipped entirely once any mess exists.
pub fn seed_defaults(pool: &DbPool, admin_password_hash: &str) {
    let conn = pool.get().expect("Failed to get DB connection for seeding");

    let mess_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM messes", [], |row| row.get(0))
        .unwrap_or(0);
    if mess_count > 0 {
        log::info!("Database already seeded ({} messes), skipping", mess_count);
        return;
    }

    let upi_id = std::env::var("UPI_ID").unwrap_or_else(|_| "mess@oksbi".to_string());
    let upi_name = std::env::var("UPI_NAME").unwrap_or_else(|_| "Mess Management".to_string());

    conn.execute(
        "INSERT INTO messes (name, daily_meal_rate, upi_id, upi_name) VALUES (?1, 100.0, ?2, ?3)",
        params!["Default Mess", upi_id, upi_name],
    )
    .expect("Failed to seed default mess");
    let mess_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO users (username, password_hash, is_admin, mess_id) VALUES ('admin', ?1, 1, ?2)",
        params![admin_password_hash, mess_id],
    )
    .expect("Failed to seed admin user");

    conn.execute(
        "INSERT INTO settings (key, value, description) VALUES \
         ('daily_meal_rate', '100.0', 'Daily rate for 2 meals (lunch + dinner)')",
        [],
    )
    .expect("Failed to seed default settings");

    log::info!("Seeded default mess (id={}) and admin user", mess_id);
}
