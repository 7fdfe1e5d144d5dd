//! Shared test infrastructure for model-layer tests.
//!
//! `setup_test_db()` creates a temporary SQLite database with the full
//! schema and one seeded mess, which is what nearly every test needs.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use tempfile::TempDir;

use messmate::db::MIGRATIONS;
use messmate::models::attendance::{self, MealType, NewAttendance};
use messmate::models::student::{self, NewStudent};

pub const TEST_MESS_RATE: f64 = 100.0;

/// Returns (TempDir, Connection, mess_id). The TempDir must be kept alive
/// for the Connection to remain valid.
pub fn setup_test_db() -> (TempDir, Connection, i64) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let conn = Connection::open(&db_path).expect("Failed to open test DB");

    conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA journal_mode=WAL;")
        .expect("Failed to set pragmas");
    conn.execute_batch(MIGRATIONS).expect("Failed to run migrations");

    let mess_id = messmate::models::mess::create(
        &conn,
        "Test Mess",
        TEST_MESS_RATE,
        Some("test@upi"),
        Some("Test Mess"),
    )
    .expect("Failed to seed test mess");

    (dir, conn, mess_id)
}

/// Insert a student with generated roll number and a dummy password hash.
pub fn add_student(conn: &Connection, mess_id: i64, name: &str) -> i64 {
    let roll_no = student::next_roll_no(conn).expect("Failed to allocate roll number");
    let new = NewStudent {
        name: name.to_string(),
        department: String::new(),
        contact: String::new(),
        email: String::new(),
        address: String::new(),
    };
    student::create(conn, &new, &roll_no, "not-a-real-hash", mess_id)
        .expect("Failed to create student")
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

pub fn datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").expect("valid test datetime")
}

/// Mark attendance at an explicit timestamp.
pub fn mark_at(
    conn: &Connection,
    student_id: i64,
    day: &str,
    meal: MealType,
    stamp: &str,
) -> i64 {
    attendance::mark(
        conn,
        &NewAttendance {
            student_id,
            date: date(day),
            meal_type: meal,
            method: "manual",
            marked_by: "admin",
            session_id: None,
        },
        datetime(stamp),
    )
    .expect("Failed to mark attendance")
}
