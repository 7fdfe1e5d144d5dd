use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

/// A settlement attempt against a bill. Students submit payments with a
/// transaction reference; an admin verifies or rejects them.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: i64,
    pub bill_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub amount: f64,
    pub method: String,
    pub reference: String,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: String,
    pub verified_at: Option<String>,
    pub verified_by: Option<String>,
}

pub const ALLOWED_METHODS: &[&str] = &["upi", "card", "netbanking", "cash", "wallet", "other"];

const SELECT_PAYMENT: &str = "\
    SELECT p.id, p.bill_id, p.student_id, s.name AS student_name, p.amount, \
           COALESCE(p.method, '') AS method, COALESCE(p.reference, '') AS reference, \
           p.notes, p.status, p.created_at, p.verified_at, p.verified_by \
    FROM payments p \
    JOIN students s ON s.id = p.student_id";

fn row_to_payment(row: &rusqlite::Row) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get("id")?,
        bill_id: row.get("bill_id")?,
        student_id: row.get("student_id")?,
        student_name: row.get("student_name")?,
        amount: row.get("amount")?,
        method: row.get("method")?,
        reference: row.get("reference")?,
        notes: row.get("notes")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        verified_at: row.get("verified_at")?,
        verified_by: row.get("verified_by")?,
    })
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Payment>> {
    conn.query_row(
        &format!("{SELECT_PAYMENT} WHERE p.id = ?1"),
        params![id],
        row_to_payment,
    )
    .optional()
}

/// A bill's payments, newest first.
pub fn find_by_bill(conn: &Connection, bill_id: i64) -> rusqlite::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_PAYMENT} WHERE p.bill_id = ?1 ORDER BY p.created_at DESC, p.id DESC"
    ))?;
    stmt.query_map(params![bill_id], row_to_payment)?
        .collect::<Result<Vec<_>, _>>()
}

pub fn find_recent_by_student(
    conn: &Connection,
    student_id: i64,
    limit: i64,
) -> rusqlite::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_PAYMENT} WHERE p.student_id = ?1 ORDER BY p.created_at DESC, p.id DESC LIMIT ?2"
    ))?;
    stmt.query_map(params![student_id, limit], row_to_payment)?
        .collect::<Result<Vec<_>, _>>()
}

/// True when the bill already has a payment awaiting verification.
pub fn has_submitted(conn: &Connection, bill_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM payments WHERE bill_id = ?1 AND status = 'submitted'",
        params![bill_id],
        |row| row.get(0),
    )
}

pub fn submit(
    conn: &Connection,
    mess_id: i64,
    bill_id: i64,
    student_id: i64,
    amount: f64,
    method: &str,
    reference: &str,
    notes: Option<&str>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO payments (bill_id, student_id, amount, method, reference, notes, status, mess_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'submitted', ?7)",
        params![bill_id, student_id, amount, method, reference, notes, mess_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Record an admin-entered settlement that is verified on the spot.
pub fn record_manual(
    conn: &Connection,
    mess_id: i64,
    bill_id: i64,
    student_id: i64,
    amount: f64,
    method: &str,
    reference: &str,
    notes: Option<&str>,
    verified_by: &str,
    now: NaiveDateTime,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO payments (bill_id, student_id, amount, method, reference, notes, status, \
                               verified_at, verified_by, mess_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'verified', ?7, ?8, ?9)",
        params![
            bill_id,
            student_id,
            amount,
            method,
            reference,
            notes,
            now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            verified_by,
            mess_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Verify a payment: stamp it, mark the bill paid and reject every other
/// submitted payment on the bill so duplicates cannot be verified later.
pub fn verify(
    conn: &Connection,
    payment: &Payment,
    verified_by: &str,
    now: NaiveDateTime,
) -> rusqlite::Result<()> {
    let stamp = now.format("%Y-%m-%dT%H:%M:%S").to_string();
    conn.execute(
        "UPDATE payments SET status = 'verified', verified_at = ?2, verified_by = ?3, updated_at = ?2 \
         WHERE id = ?1",
        params![payment.id, stamp, verified_by],
    )?;
    conn.execute(
        "UPDATE payments SET status = 'rejected', verified_at = ?2, verified_by = ?3, updated_at = ?2 \
         WHERE bill_id = ?1 AND id != ?4 AND status = 'submitted'",
        params![payment.bill_id, stamp, verified_by, payment.id],
    )?;
    conn.execute("UPDATE bills SET paid = 1 WHERE id = ?1", params![payment.bill_id])?;
    Ok(())
}

pub fn reject(
    conn: &Connection,
    payment_id: i64,
    verified_by: &str,
    now: NaiveDateTime,
) -> rusqlite::Result<()> {
    let stamp = now.format("%Y-%m-%dT%H:%M:%S").to_string();
    conn.execute(
        "UPDATE payments SET status = 'rejected', verified_at = ?2, verified_by = ?3, updated_at = ?2 \
         WHERE id = ?1",
        params![payment_id, stamp, verified_by],
    )?;
    Ok(())
}

pub fn count_by_student_status(
    conn: &Connection,
    student_id: i64,
    status: &str,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM payments WHERE student_id = ?1 AND status = ?2",
        params![student_id, status],
        |row| row.get(0),
    )
}
