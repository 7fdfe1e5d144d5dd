use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

/// A month's bill for one student: meals counted times the per-meal rate
/// (half the daily two-meal rate).
#[derive(Debug, Clone, Serialize)]
pub struct Bill {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub roll_no: String,
    pub month: u32,
    pub year: i32,
    pub amount: f64,
    pub meals_counted: i64,
    pub meal_rate: f64,
    pub paid: bool,
    pub generated_on: String,
}

/// Derived settlement state, folding in the bill's payment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    PendingVerification,
    Rejected,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::PendingVerification => "pending_verification",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Pending => "pending",
        }
    }
}

const SELECT_BILL: &str = "\
    SELECT b.id, b.student_id, s.name AS student_name, COALESCE(s.roll_no, '') AS roll_no, \
           b.month, b.year, b.amount, b.meals_counted, b.meal_rate, b.paid, b.generated_on \
    FROM bills b \
    JOIN students s ON s.id = b.student_id";

fn row_to_bill(row: &rusqlite::Row) -> rusqlite::Result<Bill> {
    Ok(Bill {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        student_name: row.get("student_name")?,
        roll_no: row.get("roll_no")?,
        month: row.get("month")?,
        year: row.get("year")?,
        amount: row.get("amount")?,
        meals_counted: row.get("meals_counted")?,
        meal_rate: row.get("meal_rate")?,
        paid: row.get("paid")?,
        generated_on: row.get("generated_on")?,
    })
}

pub fn exists(
    conn: &Connection,
    student_id: i64,
    month: u32,
    year: i32,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM bills WHERE student_id = ?1 AND month = ?2 AND year = ?3",
        params![student_id, month, year],
        |row| row.get(0),
    )
}

pub fn create(
    conn: &Connection,
    mess_id: i64,
    student_id: i64,
    month: u32,
    year: i32,
    meals_counted: i64,
    meal_rate: f64,
) -> rusqlite::Result<i64> {
    let amount = (meals_counted as f64 * meal_rate * 100.0).round() / 100.0;
    conn.execute(
        "INSERT INTO bills (student_id, month, year, amount, meals_counted, meal_rate, mess_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![student_id, month, year, amount, meals_counted, meal_rate, mess_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Bill>> {
    conn.query_row(
        &format!("{SELECT_BILL} WHERE b.id = ?1"),
        params![id],
        row_to_bill,
    )
    .optional()
}

/// All bills of a mess, grouped by student, newest bill first per student.
pub fn find_by_mess(conn: &Connection, mess_id: i64) -> rusqlite::Result<Vec<Bill>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_BILL} WHERE s.mess_id = ?1 ORDER BY s.id, b.generated_on DESC"
    ))?;
    stmt.query_map(params![mess_id], row_to_bill)?
        .collect::<Result<Vec<_>, _>>()
}

/// A student's bills, most recent period first.
pub fn find_by_student(conn: &Connection, student_id: i64) -> rusqlite::Result<Vec<Bill>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_BILL} WHERE b.student_id = ?1 ORDER BY b.year DESC, b.month DESC"
    ))?;
    stmt.query_map(params![student_id], row_to_bill)?
        .collect::<Result<Vec<_>, _>>()
}

pub fn find_for_period(
    conn: &Connection,
    student_id: i64,
    month: u32,
    year: i32,
) -> rusqlite::Result<Option<Bill>> {
    conn.query_row(
        &format!("{SELECT_BILL} WHERE b.student_id = ?1 AND b.month = ?2 AND b.year = ?3"),
        params![student_id, month, year],
        row_to_bill,
    )
    .optional()
}

pub fn mark_paid(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("UPDATE bills SET paid = 1 WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM bills WHERE id = ?1", params![id])?;
    Ok(())
}

/// Settlement state from payment history: paid wins, then any submitted
/// payment, then any rejected one, else plain pending.
pub fn payment_status(conn: &Connection, bill: &Bill) -> rusqlite::Result<PaymentStatus> {
    if bill.paid {
        return Ok(PaymentStatus::Paid);
    }
    let submitted: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM payments WHERE bill_id = ?1 AND status = 'submitted'",
        params![bill.id],
        |row| row.get(0),
    )?;
    if submitted {
        return Ok(PaymentStatus::PendingVerification);
    }
    let rejected: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM payments WHERE bill_id = ?1 AND status = 'rejected'",
        params![bill.id],
        |row| row.get(0),
    )?;
    Ok(if rejected { PaymentStatus::Rejected } else { PaymentStatus::Pending })
}

pub fn count_unpaid_by_mess(conn: &Connection, mess_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM bills b JOIN students s ON s.id = b.student_id \
         WHERE s.mess_id = ?1 AND b.paid = 0",
        params![mess_id],
        |row| row.get(0),
    )
}
