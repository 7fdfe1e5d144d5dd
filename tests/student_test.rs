//! Student roster tests: roll-number generation, creation, updates,
//! portal password handling and delete cascades.

mod common;

use common::*;
use messmate::auth::password;
use messmate::models::attendance::MealType;
use messmate::models::student;

#[test]
fn test_roll_numbers_follow_sequence() {
    let (_dir, conn, mess_id) = setup_test_db();

    assert_eq!(student::next_roll_no(&conn).unwrap(), "STU0001");

    let first = add_student(&conn, mess_id, "Asha");
    let found = student::find_by_id(&conn, first).unwrap().unwrap();
    assert_eq!(found.roll_no, "STU0001");

    add_student(&conn, mess_id, "Vikram");
    assert_eq!(student::next_roll_no(&conn).unwrap(), "STU0003");
}

#[test]
fn test_roll_number_falls_back_to_id_on_foreign_scheme() {
    let (_dir, conn, mess_id) = setup_test_db();

    let id = add_student(&conn, mess_id, "Asha");
    conn.execute(
        "UPDATE students SET roll_no = 'LEGACY-7' WHERE id = ?1",
        rusqlite::params![id],
    )
    .unwrap();

    assert_eq!(student::next_roll_no(&conn).unwrap(), format!("STU{:04}", id + 1));
}

#[test]
fn test_find_by_roll_no() {
    let (_dir, conn, mess_id) = setup_test_db();
    let id = add_student(&conn, mess_id, "Asha");

    let found = student::find_by_roll_no(&conn, "STU0001").unwrap().unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.name, "Asha");

    assert!(student::find_by_roll_no(&conn, "STU9999").unwrap().is_none());
}

#[test]
fn test_update_details() {
    let (_dir, conn, mess_id) = setup_test_db();
    let id = add_student(&conn, mess_id, "Asha");

    student::update_details(&conn, id, "Asha R", "9876543210", "asha@example.com", "Hostel 4")
        .unwrap();

    let found = student::find_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(found.name, "Asha R");
    assert_eq!(found.contact, "9876543210");
    assert_eq!(found.email, "asha@example.com");
    assert_eq!(found.address, "Hostel 4");
}

#[test]
fn test_temp_password_round_trip() {
    let (_dir, conn, mess_id) = setup_test_db();
    let id = add_student(&conn, mess_id, "Asha");

    let temp = password::generate_temp_password(10);
    assert!(temp.len() >= 10);
    // No ambiguous glyphs in generated passwords
    assert!(!temp.contains(['0', 'O', '1', 'l', 'I']));

    let hash = password::hash_password(&temp).unwrap();
    student::set_password_hash(&conn, id, &hash).unwrap();

    let found = student::find_by_id(&conn, id).unwrap().unwrap();
    let stored = found.password_hash.expect("hash stored");
    assert!(password::verify_password(&temp, &stored).unwrap());
    assert!(!password::verify_password("wrong-password", &stored).unwrap());
}

#[test]
fn test_delete_cascades_attendance() {
    let (_dir, conn, mess_id) = setup_test_db();
    let id = add_student(&conn, mess_id, "Asha");
    mark_at(&conn, id, "2026-03-02", MealType::Lunch, "2026-03-02T12:10:00");

    student::delete(&conn, id).unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM attendance", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(student::find_by_id(&conn, id).unwrap().is_none());
}

#[test]
fn test_pagination() {
    let (_dir, conn, mess_id) = setup_test_db();
    for i in 0..7 {
        add_student(&conn, mess_id, &format!("Student {i}"));
    }

    let page = student::find_page(&conn, mess_id, 1, 3).unwrap();
    assert_eq!(page.students.len(), 3);
    assert_eq!(page.total_count, 7);
    assert_eq!(page.total_pages, 3);

    let last = student::find_page(&conn, mess_id, 3, 3).unwrap();
    assert_eq!(last.students.len(), 1);
}

#[test]
fn test_roster_is_scoped_by_mess() {
    let (_dir, conn, mess_id) = setup_test_db();
    let other_mess =
        messmate::models::mess::create(&conn, "Other Mess", 80.0, None, None).unwrap();

    add_student(&conn, mess_id, "Asha");
    add_student(&conn, other_mess, "Vikram");

    let ours = student::find_all_by_mess(&conn, mess_id).unwrap();
    assert_eq!(ours.len(), 1);
    assert_eq!(ours[0].name, "Asha");
    assert_eq!(student::count_by_mess(&conn, other_mess).unwrap(), 1);
}
