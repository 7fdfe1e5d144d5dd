use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::attendance::MealType;

/// A time-boxed self-scan window. Students hitting the session URL can mark
/// their own attendance for the session's date and meal until it expires or
/// an admin closes it.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSession {
    pub id: i64,
    pub token: String,
    pub date: String,
    pub meal_type: MealType,
    pub created_by: String,
    pub created_at: String,
    pub expires_at: String,
    pub is_active: bool,
    pub attendance_count: i64,
}

impl ScanSession {
    pub fn is_valid(&self, now: NaiveDateTime) -> bool {
        self.is_active && now < self.expires_at_parsed()
    }

    pub fn expires_at_parsed(&self) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&self.expires_at, "%Y-%m-%dT%H:%M:%S")
            .unwrap_or(NaiveDateTime::MIN)
    }

    pub fn date_parsed(&self) -> NaiveDate {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").unwrap_or(NaiveDate::MIN)
    }
}

const SELECT_SESSION: &str = "\
    SELECT s.id, s.token, s.date, s.meal_type, s.created_by, s.created_at, \
           s.expires_at, s.is_active, s.mess_id, \
           (SELECT COUNT(*) FROM attendance a WHERE a.session_id = s.id) AS attendance_count \
    FROM attendance_sessions s";

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<(ScanSession, i64)> {
    let meal: String = row.get("meal_type")?;
    let mess_id: i64 = row.get::<_, Option<i64>>("mess_id")?.unwrap_or(0);
    Ok((
        ScanSession {
            id: row.get("id")?,
            token: row.get("token")?,
            date: row.get("date")?,
            meal_type: MealType::parse(&meal).unwrap_or(MealType::Lunch),
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
            is_active: row.get("is_active")?,
            attendance_count: row.get("attendance_count")?,
        },
        mess_id,
    ))
}

/// Create a session valid for `duration_minutes` from `now`.
/// Returns the new session id and its URL token.
pub fn create(
    conn: &Connection,
    mess_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    created_by: &str,
    duration_minutes: i64,
    now: NaiveDateTime,
) -> rusqlite::Result<(i64, String)> {
    let token = generate_token();
    let expires_at = now + Duration::minutes(duration_minutes);
    conn.execute(
        "INSERT INTO attendance_sessions (token, date, meal_type, created_by, created_at, expires_at, mess_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            token,
            date.format("%Y-%m-%d").to_string(),
            meal_type.as_str(),
            created_by,
            now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            expires_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            mess_id,
        ],
    )?;
    Ok((conn.last_insert_rowid(), token))
}

pub fn find_by_token(conn: &Connection, token: &str) -> rusqlite::Result<Option<ScanSession>> {
    conn.query_row(
        &format!("{SELECT_SESSION} WHERE s.token = ?1"),
        params![token],
        row_to_session,
    )
    .optional()
    .map(|opt| opt.map(|(s, _)| s))
}

/// Find a session by id together with its owning mess, for tenancy checks.
pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<(ScanSession, i64)>> {
    conn.query_row(
        &format!("{SELECT_SESSION} WHERE s.id = ?1"),
        params![id],
        row_to_session,
    )
    .optional()
}

/// Today's open sessions for a mess, newest first.
pub fn find_active(
    conn: &Connection,
    mess_id: i64,
    today: NaiveDate,
) -> rusqlite::Result<Vec<ScanSession>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_SESSION} \
         WHERE s.mess_id = ?1 AND s.date = ?2 AND s.is_active = 1 \
         ORDER BY s.created_at DESC"
    ))?;
    stmt.query_map(
        params![mess_id, today.format("%Y-%m-%d").to_string()],
        row_to_session,
    )?
    .map(|r| r.map(|(s, _)| s))
    .collect()
}

pub fn close(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE attendance_sessions SET is_active = 0 WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

/// Random 32-byte hex token; unguessable enough for a short-lived URL.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}
