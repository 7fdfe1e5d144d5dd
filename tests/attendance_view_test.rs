//! Attendance view-model tests: the client-side filter/sort convenience
//! layer, table placeholders, the row delete lifecycle, and the edit
//! dialog's failure handling.

use std::time::Duration;

use messmate::models::attendance::filter::SortKey;
use messmate::view::attendance::{
    AttendanceRow, CopyLabel, EditDialog, EditOutcome, TableState, TableView, copy_feedback,
    filter_by_meal, parse_display_time, sort_rows,
};
use messmate::view::notice::{Notice, NoticeKind, NotificationSlot};

fn row(id: i64, time: &str, name: &str, meal: &str) -> AttendanceRow {
    AttendanceRow {
        id,
        time_display: time.to_string(),
        student_name: name.to_string(),
        meal_type: meal.to_string(),
    }
}

fn sample_rows() -> Vec<AttendanceRow> {
    vec![
        row(1, "12:10 PM", "Zoya", "Lunch"),
        row(2, "7:30 PM", "Asha", "Dinner"),
        row(3, "8:05 AM", "Meera", "Lunch"),
    ]
}

// --- Filtering ---

#[test]
fn test_filter_all_is_identity() {
    let rows = sample_rows();
    assert_eq!(filter_by_meal(&rows, "all"), rows);
    assert_eq!(filter_by_meal(&rows, "ALL"), rows);
}

#[test]
fn test_filter_matches_badge_text_case_insensitively() {
    let rows = sample_rows();

    let lunches = filter_by_meal(&rows, "lunch");
    assert_eq!(lunches.len(), 2);
    assert!(lunches.iter().all(|r| r.meal_type == "Lunch"));

    // Substring match, not equality
    let partial = filter_by_meal(&rows, "DIN");
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].student_name, "Asha");
}

// --- Sorting ---

#[test]
fn test_sort_recent_is_descending_by_parsed_time() {
    let mut rows = sample_rows();
    sort_rows(&mut rows, SortKey::Recent);
    let names: Vec<_> = rows.iter().map(|r| r.student_name.as_str()).collect();
    assert_eq!(names, ["Asha", "Zoya", "Meera"]); // 7:30 PM, 12:10 PM, 8:05 AM
}

#[test]
fn test_sort_name_and_meal_are_ascending() {
    let mut rows = sample_rows();
    sort_rows(&mut rows, SortKey::Name);
    let names: Vec<_> = rows.iter().map(|r| r.student_name.as_str()).collect();
    assert_eq!(names, ["Asha", "Meera", "Zoya"]);

    let mut rows = sample_rows();
    sort_rows(&mut rows, SortKey::MealType);
    assert_eq!(rows[0].meal_type, "Dinner");
}

#[test]
fn test_unparseable_time_sorts_as_midnight() {
    assert_eq!(parse_display_time("7:30 PM").format("%H:%M").to_string(), "19:30");
    assert_eq!(parse_display_time("12:10 AM").format("%H:%M").to_string(), "00:10");
    assert_eq!(parse_display_time("garbage").format("%H:%M").to_string(), "00:00");

    let mut rows = vec![row(1, "???", "Broken", "Lunch"), row(2, "9:00 AM", "Asha", "Lunch")];
    sort_rows(&mut rows, SortKey::Recent);
    // The broken row compares as midnight and lands last
    assert_eq!(rows[1].student_name, "Broken");
}

// --- Table state and placeholders ---

#[test]
fn test_table_view_distinguishes_empty_from_no_match() {
    let empty = TableState::new(vec![]);
    assert_eq!(empty.view("all", SortKey::Recent), TableView::Empty);

    let table = TableState::new(sample_rows());
    assert_eq!(table.view("breakfast", SortKey::Recent), TableView::NoMatch);

    match table.view("lunch", SortKey::Name) {
        TableView::Rows(rows) => {
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].student_name, "Meera");
        }
        other => panic!("expected rows, got {other:?}"),
    }
}

#[test]
fn test_delete_removes_row_and_emptiness_follows() {
    let mut table = TableState::new(vec![row(42, "12:10 PM", "Asha", "Lunch")]);

    assert!(table.remove_row(42));
    assert!(table.rows().iter().all(|r| r.id != 42));
    assert!(table.is_empty());
    assert_eq!(table.view("all", SortKey::Recent), TableView::Empty);

    // Removing an id that is not on screen reports false
    assert!(!table.remove_row(42));
}

#[test]
fn test_delete_with_rows_remaining_keeps_table() {
    let mut table = TableState::new(sample_rows());
    assert!(table.remove_row(2));
    assert!(!table.is_empty());
    match table.view("all", SortKey::Recent) {
        TableView::Rows(rows) => assert_eq!(rows.len(), 2),
        other => panic!("expected rows, got {other:?}"),
    }
}

// --- Edit dialog ---

#[test]
fn test_edit_failure_keeps_dialog_open_with_inline_message() {
    let mut dialog = EditDialog::open(7, "2024-01-05", "dinner");
    dialog.begin_save();
    assert!(dialog.saving);

    let outcome = dialog.on_save_result(Err("conflict".to_string()));
    assert_eq!(outcome, EditOutcome::KeepOpen);
    assert_eq!(dialog.error.as_deref(), Some("conflict"));
    assert!(!dialog.saving); // save control re-enabled
}

#[test]
fn test_edit_success_closes_and_schedules_reload() {
    let mut dialog = EditDialog::open(7, "2024-01-05", "dinner");
    dialog.begin_save();

    let outcome = dialog.on_save_result(Ok(()));
    assert_eq!(
        outcome,
        EditOutcome::Close { reload_after: Duration::from_millis(600) }
    );
    assert!(dialog.error.is_none());
}

#[test]
fn test_begin_save_clears_stale_error() {
    let mut dialog = EditDialog::open(7, "2024-01-05", "dinner");
    dialog.begin_save();
    dialog.on_save_result(Err("conflict".to_string()));

    dialog.begin_save();
    assert!(dialog.error.is_none());
}

// --- Notifications and clipboard feedback ---

#[test]
fn test_notification_slot_replaces_previous() {
    let mut slot = NotificationSlot::default();
    slot.show(Notice::success("deleted"));
    slot.show(Notice::error("update failed"));

    let current = slot.current().unwrap();
    assert_eq!(current.kind, NoticeKind::Error);
    assert_eq!(current.message, "update failed");

    slot.dismiss();
    assert!(slot.current().is_none());
}

#[test]
fn test_copy_feedback_confirms_then_reverts() {
    assert_eq!(
        copy_feedback(Ok(())),
        CopyLabel::Copied { revert_after: Duration::from_millis(1500) }
    );
    // Clipboard failure falls back to the legacy path; label untouched
    assert_eq!(copy_feedback(Err(())), CopyLabel::Idle);
}
