//! Billing and payment tests: bill generation arithmetic, uniqueness,
//! payment verification flows, and the derived settlement status.

mod common;

use common::*;
use messmate::models::attendance::MealType;
use messmate::models::bill::{self, PaymentStatus};
use messmate::models::payment;
use messmate::upi;

fn seed_march_attendance(conn: &rusqlite::Connection, student: i64, meals: usize) {
    for i in 0..meals {
        let day = format!("2026-03-{:02}", (i / 2) + 1);
        let (meal, stamp) = if i % 2 == 0 {
            (MealType::Lunch, format!("{day}T12:10:00"))
        } else {
            (MealType::Dinner, format!("{day}T19:30:00"))
        };
        mark_at(conn, student, &day, meal, &stamp);
    }
}

#[test]
fn test_bill_amount_is_meals_times_half_daily_rate() {
    let (_dir, conn, mess_id) = setup_test_db();
    let asha = add_student(&conn, mess_id, "Asha");
    seed_march_attendance(&conn, asha, 11);

    let meals = messmate::models::attendance::count_for_student_month(&conn, asha, 2026, 3).unwrap();
    assert_eq!(meals, 11);

    let meal_rate = TEST_MESS_RATE / 2.0;
    let id = bill::create(&conn, mess_id, asha, 3, 2026, meals, meal_rate).unwrap();

    let b = bill::find_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(b.amount, 550.0);
    assert_eq!(b.meals_counted, 11);
    assert_eq!(b.meal_rate, 50.0);
    assert!(!b.paid);
}

#[test]
fn test_bill_uniqueness_per_period() {
    let (_dir, conn, mess_id) = setup_test_db();
    let asha = add_student(&conn, mess_id, "Asha");

    bill::create(&conn, mess_id, asha, 3, 2026, 10, 50.0).unwrap();
    assert!(bill::exists(&conn, asha, 3, 2026).unwrap());
    assert!(!bill::exists(&conn, asha, 4, 2026).unwrap());

    // The (student, month, year) unique constraint backs the handler's check
    assert!(bill::create(&conn, mess_id, asha, 3, 2026, 10, 50.0).is_err());
}

#[test]
fn test_payment_status_progression() {
    let (_dir, conn, mess_id) = setup_test_db();
    let asha = add_student(&conn, mess_id, "Asha");
    let bill_id = bill::create(&conn, mess_id, asha, 3, 2026, 10, 50.0).unwrap();

    let b = bill::find_by_id(&conn, bill_id).unwrap().unwrap();
    assert_eq!(bill::payment_status(&conn, &b).unwrap(), PaymentStatus::Pending);

    let payment_id =
        payment::submit(&conn, mess_id, bill_id, asha, 500.0, "upi", "TXN-1", None).unwrap();
    assert_eq!(
        bill::payment_status(&conn, &b).unwrap(),
        PaymentStatus::PendingVerification
    );

    payment::reject(&conn, payment_id, "admin", datetime("2026-04-01T10:00:00")).unwrap();
    assert_eq!(bill::payment_status(&conn, &b).unwrap(), PaymentStatus::Rejected);

    let second =
        payment::submit(&conn, mess_id, bill_id, asha, 500.0, "upi", "TXN-2", None).unwrap();
    let p = payment::find_by_id(&conn, second).unwrap().unwrap();
    payment::verify(&conn, &p, "admin", datetime("2026-04-02T10:00:00")).unwrap();

    let b = bill::find_by_id(&conn, bill_id).unwrap().unwrap();
    assert!(b.paid);
    assert_eq!(bill::payment_status(&conn, &b).unwrap(), PaymentStatus::Paid);
}

#[test]
fn test_verify_rejects_other_submitted_payments() {
    let (_dir, conn, mess_id) = setup_test_db();
    let asha = add_student(&conn, mess_id, "Asha");
    let bill_id = bill::create(&conn, mess_id, asha, 3, 2026, 10, 50.0).unwrap();

    let first = payment::submit(&conn, mess_id, bill_id, asha, 500.0, "upi", "TXN-1", None).unwrap();
    // A second submission slipped in before the first was verified
    let second =
        payment::submit(&conn, mess_id, bill_id, asha, 500.0, "cash", "TXN-2", None).unwrap();

    let p = payment::find_by_id(&conn, first).unwrap().unwrap();
    payment::verify(&conn, &p, "admin", datetime("2026-04-01T10:00:00")).unwrap();

    let verified = payment::find_by_id(&conn, first).unwrap().unwrap();
    assert_eq!(verified.status, "verified");
    assert_eq!(verified.verified_by.as_deref(), Some("admin"));

    let rejected = payment::find_by_id(&conn, second).unwrap().unwrap();
    assert_eq!(rejected.status, "rejected");
}

#[test]
fn test_has_submitted_guards_duplicate_submissions() {
    let (_dir, conn, mess_id) = setup_test_db();
    let asha = add_student(&conn, mess_id, "Asha");
    let bill_id = bill::create(&conn, mess_id, asha, 3, 2026, 10, 50.0).unwrap();

    assert!(!payment::has_submitted(&conn, bill_id).unwrap());
    payment::submit(&conn, mess_id, bill_id, asha, 500.0, "upi", "TXN-1", None).unwrap();
    assert!(payment::has_submitted(&conn, bill_id).unwrap());
}

#[test]
fn test_manual_settlement_is_verified_immediately() {
    let (_dir, conn, mess_id) = setup_test_db();
    let asha = add_student(&conn, mess_id, "Asha");
    let bill_id = bill::create(&conn, mess_id, asha, 3, 2026, 10, 50.0).unwrap();

    let payment_id = payment::record_manual(
        &conn,
        mess_id,
        bill_id,
        asha,
        500.0,
        "cash",
        "MANUAL-20260401100000",
        Some("paid at counter"),
        "admin",
        datetime("2026-04-01T10:00:00"),
    )
    .unwrap();
    bill::mark_paid(&conn, bill_id).unwrap();

    let p = payment::find_by_id(&conn, payment_id).unwrap().unwrap();
    assert_eq!(p.status, "verified");
    let b = bill::find_by_id(&conn, bill_id).unwrap().unwrap();
    assert!(b.paid);
}

#[test]
fn test_unpaid_count_by_mess() {
    let (_dir, conn, mess_id) = setup_test_db();
    let asha = add_student(&conn, mess_id, "Asha");
    let vikram = add_student(&conn, mess_id, "Vikram");

    let paid_bill = bill::create(&conn, mess_id, asha, 2, 2026, 8, 50.0).unwrap();
    bill::create(&conn, mess_id, asha, 3, 2026, 10, 50.0).unwrap();
    bill::create(&conn, mess_id, vikram, 3, 2026, 12, 50.0).unwrap();
    bill::mark_paid(&conn, paid_bill).unwrap();

    assert_eq!(bill::count_unpaid_by_mess(&conn, mess_id).unwrap(), 2);
}

#[test]
fn test_upi_link_encodes_payee_and_note() {
    let link = upi::payment_link("mess@oksbi", "Test Mess", 550.0, 7, 3, "STU0001", "20260302120000");

    assert_eq!(link.amount, "550.00");
    assert_eq!(link.transaction_ref, "M3-BILL7-20260302120000");
    assert!(link.upi_link.starts_with("upi://pay?pa=mess@oksbi&pn=Test%20Mess&am=550.00&cu=INR"));
    assert!(link.upi_link.contains("tn=Mess%20Bill%20%237%20-%20STU0001"));
    assert!(link.upi_link.contains("tr=M3-BILL7-20260302120000"));
}
