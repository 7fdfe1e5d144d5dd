use rusqlite::{Connection, OptionalExtension, params};

/// One tenant: a dining facility with its own roster, billing rate and
/// UPI collection account.
#[derive(Debug, Clone)]
pub struct Mess {
    pub id: i64,
    pub name: String,
    pub daily_meal_rate: f64,
    pub upi_id: Option<String>,
    pub upi_name: Option<String>,
    pub is_active: bool,
}

fn row_to_mess(row: &rusqlite::Row) -> rusqlite::Result<Mess> {
    Ok(Mess {
        id: row.get("id")?,
        name: row.get("name")?,
        daily_meal_rate: row.get("daily_meal_rate")?,
        upi_id: row.get("upi_id")?,
        upi_name: row.get("upi_name")?,
        is_active: row.get("is_active")?,
    })
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Mess>> {
    conn.query_row(
        "SELECT id, name, daily_meal_rate, upi_id, upi_name, is_active FROM messes WHERE id = ?1",
        params![id],
        row_to_mess,
    )
    .optional()
}

pub fn name_taken(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM messes WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
}

pub fn create(
    conn: &Connection,
    name: &str,
    daily_meal_rate: f64,
    upi_id: Option<&str>,
    upi_name: Option<&str>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO messes (name, daily_meal_rate, upi_id, upi_name) VALUES (?1, ?2, ?3, ?4)",
        params![name, daily_meal_rate, upi_id, upi_name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_config(
    conn: &Connection,
    id: i64,
    daily_meal_rate: f64,
    upi_id: &str,
    upi_name: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE messes SET daily_meal_rate = ?2, upi_id = ?3, upi_name = ?4 WHERE id = ?1",
        params![id, daily_meal_rate, upi_id, upi_name],
    )?;
    Ok(())
}

/// Resolve the UPI collection account for a mess: the mess's own settings
/// win, then the `settings` table fallback, then the environment default.
pub fn effective_upi(conn: &Connection, mess_id: i64) -> (String, String) {
    let mess = find_by_id(conn, mess_id).ok().flatten();
    if let Some(m) = &mess {
        if m.upi_id.is_some() || m.upi_name.is_some() {
            let upi_id = m
                .upi_id
                .clone()
                .unwrap_or_else(|| super::setting::get_value(conn, "upi_id", "mess@oksbi"));
            let upi_name = m
                .upi_name
                .clone()
                .unwrap_or_else(|| super::setting::get_value(conn, "upi_name", "Mess Management"));
            return (upi_id, upi_name);
        }
    }
    (
        super::setting::get_value(conn, "upi_id", "mess@oksbi"),
        super::setting::get_value(conn, "upi_name", "Mess Management"),
    )
}

/// Daily rate for two meals; the per-meal rate used for billing is half this.
pub fn effective_daily_rate(conn: &Connection, mess_id: i64) -> f64 {
    if let Ok(Some(m)) = find_by_id(conn, mess_id) {
        if m.daily_meal_rate > 0.0 {
            return m.daily_meal_rate;
        }
    }
    super::setting::get_value(conn, "daily_meal_rate", "100.0")
        .parse()
        .unwrap_or(100.0)
}
