use rusqlite::{Connection, params};

/// Get a single setting's value by key, returning a default if not found.
pub fn get_value(conn: &Connection, key: &str, default: &str) -> String {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .unwrap_or_else(|_| default.to_string())
}

/// Upsert a setting value, optionally replacing its description.
pub fn set_value(
    conn: &Connection,
    key: &str,
    value: &str,
    description: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value, description) VALUES (?1, ?2, ?3) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             description = COALESCE(excluded.description, settings.description)",
        params![key, value, description],
    )?;
    Ok(())
}
