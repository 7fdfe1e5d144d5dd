use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};

use super::filter::SortKey;
use super::types::{AttendanceRecord, MealType, NewAttendance};

const SELECT_RECORD: &str = "\
    SELECT a.id, a.student_id, s.name AS student_name, a.date, a.meal_type, \
           a.timestamp, a.method, a.marked_by \
    FROM attendance a \
    JOIN students s ON s.id = a.student_id";

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<AttendanceRecord> {
    let date: String = row.get("date")?;
    let timestamp: String = row.get("timestamp")?;
    let meal: String = row.get("meal_type")?;
    Ok(AttendanceRecord {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        student_name: row.get("student_name")?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        meal_type: MealType::parse(&meal).unwrap_or(MealType::Lunch),
        timestamp: NaiveDateTime::parse_from_str(&timestamp, "%Y-%m-%dT%H:%M:%S").map_err(
            |e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            },
        )?,
        method: row.get("method")?,
        marked_by: row.get("marked_by")?,
    })
}

/// True when the student already has this meal marked for this date.
pub fn exists(
    conn: &Connection,
    student_id: i64,
    date: NaiveDate,
    meal_type: MealType,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM attendance \
         WHERE student_id = ?1 AND date = ?2 AND meal_type = ?3",
        params![student_id, date.format("%Y-%m-%d").to_string(), meal_type.as_str()],
        |row| row.get(0),
    )
}

pub fn mark(conn: &Connection, new: &NewAttendance, now: NaiveDateTime) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO attendance (student_id, date, meal_type, timestamp, method, marked_by, session_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.student_id,
            new.date.format("%Y-%m-%d").to_string(),
            new.meal_type.as_str(),
            now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            new.method,
            new.marked_by,
            new.session_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<AttendanceRecord>> {
    conn.query_row(
        &format!("{SELECT_RECORD} WHERE a.id = ?1"),
        params![id],
        row_to_record,
    )
    .optional()
}

/// List one mess's records in an inclusive date window, optionally narrowed
/// to a meal type. The server is the authority on filtering and ordering;
/// anything the page does on top is cosmetic.
pub fn find_in_range(
    conn: &Connection,
    mess_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    meal: Option<MealType>,
    sort: SortKey,
) -> rusqlite::Result<Vec<AttendanceRecord>> {
    let order = match sort {
        SortKey::Name => "s.name ASC, a.timestamp DESC",
        SortKey::MealType => "a.meal_type ASC, a.timestamp DESC",
        SortKey::Recent => "a.timestamp DESC",
    };
    let sql = format!(
        "{SELECT_RECORD} \
         WHERE s.mess_id = ?1 AND a.date BETWEEN ?2 AND ?3 \
           AND (?4 IS NULL OR a.meal_type = ?4) \
         ORDER BY {order}"
    );
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_map(
        params![
            mess_id,
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
            meal.map(|m| m.as_str()),
        ],
        row_to_record,
    )?
    .collect::<Result<Vec<_>, _>>()
}

/// Move a record to a new date/meal, refreshing its timestamp.
pub fn update(
    conn: &Connection,
    id: i64,
    date: NaiveDate,
    meal_type: MealType,
    now: NaiveDateTime,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE attendance SET date = ?2, meal_type = ?3, timestamp = ?4 WHERE id = ?1",
        params![
            id,
            date.format("%Y-%m-%d").to_string(),
            meal_type.as_str(),
            now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

/// True when another record of the same student occupies (date, meal).
pub fn duplicate_exists(
    conn: &Connection,
    student_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    excluding_id: i64,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM attendance \
         WHERE student_id = ?1 AND date = ?2 AND meal_type = ?3 AND id != ?4",
        params![
            student_id,
            date.format("%Y-%m-%d").to_string(),
            meal_type.as_str(),
            excluding_id
        ],
        |row| row.get(0),
    )
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM attendance WHERE id = ?1", params![id])
}

/// Meals recorded for a student in a calendar month.
pub fn count_for_student_month(
    conn: &Connection,
    student_id: i64,
    year: i32,
    month: u32,
) -> rusqlite::Result<i64> {
    let (start, end) = month_bounds(year, month);
    conn.query_row(
        "SELECT COUNT(*) FROM attendance \
         WHERE student_id = ?1 AND date >= ?2 AND date < ?3",
        params![
            student_id,
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string()
        ],
        |row| row.get(0),
    )
}

/// A student's records inside an inclusive window, newest date first.
pub fn find_for_student_in_range(
    conn: &Connection,
    student_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    meal: Option<MealType>,
) -> rusqlite::Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "{SELECT_RECORD} \
         WHERE a.student_id = ?1 AND a.date BETWEEN ?2 AND ?3 \
           AND (?4 IS NULL OR a.meal_type = ?4) \
         ORDER BY a.date DESC, a.timestamp DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_map(
        params![
            student_id,
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
            meal.map(|m| m.as_str()),
        ],
        row_to_record,
    )?
    .collect::<Result<Vec<_>, _>>()
}

/// Meals marked today for a mess, split by type — dashboard counters.
pub fn today_counts(
    conn: &Connection,
    mess_id: i64,
    today: NaiveDate,
) -> rusqlite::Result<(i64, i64)> {
    let count_for = |meal: &str| -> rusqlite::Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM attendance a \
             JOIN students s ON s.id = a.student_id \
             WHERE s.mess_id = ?1 AND a.date = ?2 AND a.meal_type = ?3",
            params![mess_id, today.format("%Y-%m-%d").to_string(), meal],
            |row| row.get(0),
        )
    };
    Ok((count_for("lunch")?, count_for("dinner")?))
}

/// First day of the month and first day of the following month.
pub fn month_bounds(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .expect("month in 1..=12 produces a valid first day");
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("January 1st is always valid")
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).expect("first of next month is valid")
    };
    (start, end)
}
