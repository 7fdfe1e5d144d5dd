use rusqlite::{Connection, OptionalExtension, params};

use super::types::{NewStudent, Student, StudentPage};

const SELECT_STUDENT: &str = "\
    SELECT id, name, COALESCE(roll_no, '') AS roll_no, \
           COALESCE(department, '') AS department, COALESCE(contact, '') AS contact, \
           COALESCE(email, '') AS email, COALESCE(address, '') AS address, \
           password_hash, COALESCE(mess_id, 0) AS mess_id, created_at \
    FROM students";

fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get("id")?,
        name: row.get("name")?,
        roll_no: row.get("roll_no")?,
        department: row.get("department")?,
        contact: row.get("contact")?,
        email: row.get("email")?,
        address: row.get("address")?,
        password_hash: row.get("password_hash")?,
        mess_id: row.get("mess_id")?,
        created_at: row.get("created_at")?,
    })
}

/// Next roll number in the STU0001 sequence. Falls back to an id-based
/// number when the latest roll number does not follow the scheme.
pub fn next_roll_no(conn: &Connection) -> rusqlite::Result<String> {
    let last: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, COALESCE(roll_no, '') FROM students ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let roll = match last {
        None => "STU0001".to_string(),
        Some((id, roll_no)) => {
            let next = roll_no
                .strip_prefix("STU")
                .and_then(|n| n.parse::<i64>().ok())
                .map(|n| n + 1)
                .unwrap_or(id + 1);
            format!("STU{next:04}")
        }
    };
    Ok(roll)
}

pub fn create(
    conn: &Connection,
    new: &NewStudent,
    roll_no: &str,
    password_hash: &str,
    mess_id: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO students (name, roll_no, department, contact, email, address, password_hash, mess_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new.name,
            roll_no,
            new.department,
            new.contact,
            new.email,
            new.address,
            password_hash,
            mess_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Student>> {
    conn.query_row(
        &format!("{SELECT_STUDENT} WHERE id = ?1"),
        params![id],
        row_to_student,
    )
    .optional()
}

pub fn find_by_roll_no(conn: &Connection, roll_no: &str) -> rusqlite::Result<Option<Student>> {
    conn.query_row(
        &format!("{SELECT_STUDENT} WHERE roll_no = ?1"),
        params![roll_no],
        row_to_student,
    )
    .optional()
}

/// Roster page for one mess, ordered by id.
pub fn find_page(
    conn: &Connection,
    mess_id: i64,
    page: i64,
    per_page: i64,
) -> rusqlite::Result<StudentPage> {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 200);
    let offset = (page - 1) * per_page;

    let total_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE mess_id = ?1",
        params![mess_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{SELECT_STUDENT} WHERE mess_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
    ))?;
    let students = stmt
        .query_map(params![mess_id, per_page, offset], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;

    let total_pages = ((total_count as f64) / (per_page as f64)).ceil() as i64;
    Ok(StudentPage { students, page, per_page, total_count, total_pages })
}

/// All students of a mess, alphabetical — for the manual-marking dropdown.
pub fn find_all_by_mess(conn: &Connection, mess_id: i64) -> rusqlite::Result<Vec<Student>> {
    let mut stmt =
        conn.prepare(&format!("{SELECT_STUDENT} WHERE mess_id = ?1 ORDER BY name"))?;
    stmt.query_map(params![mess_id], row_to_student)?
        .collect::<Result<Vec<_>, _>>()
}

pub fn update_details(
    conn: &Connection,
    id: i64,
    name: &str,
    contact: &str,
    email: &str,
    address: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE students SET name = ?2, contact = ?3, email = ?4, address = ?5 WHERE id = ?1",
        params![id, name, contact, email, address],
    )?;
    Ok(())
}

pub fn set_password_hash(conn: &Connection, id: i64, hash: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE students SET password_hash = ?2 WHERE id = ?1",
        params![id, hash],
    )?;
    Ok(())
}

/// Delete a student; attendance, bills and payments cascade.
pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM students WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn count_by_mess(conn: &Connection, mess_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM students WHERE mess_id = ?1",
        params![mess_id],
        |row| row.get(0),
    )
}
