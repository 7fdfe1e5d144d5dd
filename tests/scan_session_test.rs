//! Self-scan session tests: token lookup, validity window, closing, and
//! the duplicate handling of token-based submissions.

mod common;

use common::*;
use messmate::models::attendance::{self, MealType, NewAttendance};
use messmate::models::scan_session;

#[test]
fn test_create_and_find_by_token() {
    let (_dir, conn, mess_id) = setup_test_db();

    let now = datetime("2026-03-02T12:00:00");
    let (id, token) =
        scan_session::create(&conn, mess_id, date("2026-03-02"), MealType::Lunch, "admin", 120, now)
            .unwrap();
    assert!(id > 0);
    assert_eq!(token.len(), 64); // 32 random bytes, hex-encoded

    let found = scan_session::find_by_token(&conn, &token).unwrap().unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.meal_type, MealType::Lunch);
    assert_eq!(found.expires_at, "2026-03-02T14:00:00");
    assert_eq!(found.attendance_count, 0);

    assert!(scan_session::find_by_token(&conn, "bogus").unwrap().is_none());
}

#[test]
fn test_validity_window() {
    let (_dir, conn, mess_id) = setup_test_db();

    let opened = datetime("2026-03-02T12:00:00");
    let (_, token) =
        scan_session::create(&conn, mess_id, date("2026-03-02"), MealType::Lunch, "admin", 120, opened)
            .unwrap();
    let session = scan_session::find_by_token(&conn, &token).unwrap().unwrap();

    assert!(session.is_valid(datetime("2026-03-02T13:59:59")));
    assert!(!session.is_valid(datetime("2026-03-02T14:00:00")));
}

#[test]
fn test_closed_session_is_invalid() {
    let (_dir, conn, mess_id) = setup_test_db();

    let now = datetime("2026-03-02T12:00:00");
    let (id, token) =
        scan_session::create(&conn, mess_id, date("2026-03-02"), MealType::Lunch, "admin", 120, now)
            .unwrap();

    scan_session::close(&conn, id).unwrap();
    let session = scan_session::find_by_token(&conn, &token).unwrap().unwrap();
    assert!(!session.is_valid(datetime("2026-03-02T12:30:00")));
}

#[test]
fn test_find_active_excludes_closed_and_other_days() {
    let (_dir, conn, mess_id) = setup_test_db();
    let now = datetime("2026-03-02T12:00:00");

    let (open_id, _) =
        scan_session::create(&conn, mess_id, date("2026-03-02"), MealType::Lunch, "admin", 120, now)
            .unwrap();
    let (closed_id, _) =
        scan_session::create(&conn, mess_id, date("2026-03-02"), MealType::Dinner, "admin", 120, now)
            .unwrap();
    scan_session::close(&conn, closed_id).unwrap();
    scan_session::create(
        &conn,
        mess_id,
        date("2026-03-01"),
        MealType::Lunch,
        "admin",
        120,
        datetime("2026-03-01T12:00:00"),
    )
    .unwrap();

    let active = scan_session::find_active(&conn, mess_id, date("2026-03-02")).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, open_id);
}

#[test]
fn test_session_submission_counts_and_duplicates() {
    let (_dir, conn, mess_id) = setup_test_db();
    let asha = add_student(&conn, mess_id, "Asha");

    let now = datetime("2026-03-02T12:00:00");
    let (id, token) =
        scan_session::create(&conn, mess_id, date("2026-03-02"), MealType::Lunch, "admin", 120, now)
            .unwrap();
    let session = scan_session::find_by_token(&conn, &token).unwrap().unwrap();

    // First submission goes through
    assert!(!attendance::exists(&conn, asha, session.date_parsed(), session.meal_type).unwrap());
    attendance::mark(
        &conn,
        &NewAttendance {
            student_id: asha,
            date: session.date_parsed(),
            meal_type: session.meal_type,
            method: "qr_scan",
            marked_by: "Asha",
            session_id: Some(id),
        },
        now,
    )
    .unwrap();

    // Second submission for the same meal is a duplicate
    assert!(attendance::exists(&conn, asha, session.date_parsed(), session.meal_type).unwrap());

    let refreshed = scan_session::find_by_token(&conn, &token).unwrap().unwrap();
    assert_eq!(refreshed.attendance_count, 1);
}
