//! View-model for the attendance list page: the client-side convenience
//! layer over rows the server already rendered. Filtering here never
//! replaces the server's authoritative filtering — it only narrows and
//! reorders what is on screen.

use std::time::Duration;

use chrono::NaiveTime;

use crate::models::attendance::filter::SortKey;

/// How long a deleted row fades before it is removed from the table.
pub const ROW_FADE: Duration = Duration::from_millis(500);
/// Delay before reloading after a successful edit, so the success notice
/// is visible while server-side recomputation (billing) settles.
pub const EDIT_RELOAD_DELAY: Duration = Duration::from_millis(600);
/// How long the copy button shows its "copied" confirmation.
pub const COPY_CONFIRM: Duration = Duration::from_millis(1500);

/// One rendered attendance row, as the page sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRow {
    pub id: i64,
    /// 12-hour marking time, e.g. `1:05 PM`.
    pub time_display: String,
    pub student_name: String,
    /// Badge text; matching against the meal filter is done on this.
    pub meal_type: String,
}

/// Narrow rows by meal-type badge text. `all` passes everything; any other
/// value keeps rows whose badge contains it, case-insensitively.
pub fn filter_by_meal(rows: &[AttendanceRow], selected: &str) -> Vec<AttendanceRow> {
    if selected.eq_ignore_ascii_case("all") {
        return rows.to_vec();
    }
    let needle = selected.to_lowercase();
    rows.iter()
        .filter(|row| row.meal_type.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Parse a `H:MM AM/PM` display string. An unparseable string maps to
/// midnight so every row stays comparable and the sort stays total.
pub fn parse_display_time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s.trim(), "%I:%M %p")
        .unwrap_or_else(|_| NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is a valid time"))
}

/// Reorder rows in place. All sorts are stable, so equal keys keep their
/// rendered order.
pub fn sort_rows(rows: &mut [AttendanceRow], key: SortKey) {
    match key {
        SortKey::Name => rows.sort_by(|a, b| a.student_name.cmp(&b.student_name)),
        SortKey::MealType => rows.sort_by(|a, b| a.meal_type.cmp(&b.meal_type)),
        SortKey::Recent => rows.sort_by(|a, b| {
            parse_display_time(&b.time_display).cmp(&parse_display_time(&a.time_display))
        }),
    }
}

/// What the table body should show after filtering.
#[derive(Debug, PartialEq, Eq)]
pub enum TableView {
    Rows(Vec<AttendanceRow>),
    /// Rows exist but none survived the filter.
    NoMatch,
    /// The table had no rows to begin with.
    Empty,
}

/// The rendered rows of the attendance table, with the row lifecycle the
/// page goes through on deletes.
#[derive(Debug, Default)]
pub struct TableState {
    rows: Vec<AttendanceRow>,
}

impl TableState {
    pub fn new(rows: Vec<AttendanceRow>) -> Self {
        TableState { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[AttendanceRow] {
        &self.rows
    }

    /// Drop a row after its delete request succeeded (and its fade-out
    /// completed). Returns false when the id is not on screen.
    pub fn remove_row(&mut self, id: i64) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    /// Apply the current filter and sort selections to the rendered rows.
    pub fn view(&self, meal_filter: &str, sort: SortKey) -> TableView {
        if self.rows.is_empty() {
            return TableView::Empty;
        }
        let mut filtered = filter_by_meal(&self.rows, meal_filter);
        if filtered.is_empty() {
            return TableView::NoMatch;
        }
        sort_rows(&mut filtered, sort);
        TableView::Rows(filtered)
    }
}

/// Outcome of saving the edit dialog.
#[derive(Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// Close the dialog, notify, and reload once the delay elapses.
    Close { reload_after: Duration },
    /// Keep the dialog open; the error is shown inline.
    KeepOpen,
}

/// The edit-attendance modal: pre-filled from the row, saves date and meal
/// type, and stays open with an inline message when the server rejects.
#[derive(Debug, Clone)]
pub struct EditDialog {
    pub record_id: i64,
    pub date: String,
    pub meal_type: String,
    pub error: Option<String>,
    pub saving: bool,
}

impl EditDialog {
    pub fn open(record_id: i64, date: &str, meal_type: &str) -> Self {
        EditDialog {
            record_id,
            date: date.to_string(),
            meal_type: meal_type.to_string(),
            error: None,
            saving: false,
        }
    }

    /// The save control was pressed: disable it and clear any stale error.
    pub fn begin_save(&mut self) {
        self.saving = true;
        self.error = None;
    }

    pub fn on_save_result(&mut self, result: Result<(), String>) -> EditOutcome {
        self.saving = false;
        match result {
            Ok(()) => EditOutcome::Close { reload_after: EDIT_RELOAD_DELAY },
            Err(message) => {
                self.error = Some(message);
                EditOutcome::KeepOpen
            }
        }
    }
}

/// Label state of the copy-scan-URL button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyLabel {
    Idle,
    /// Confirmation shown for [`COPY_CONFIRM`], then reverts to idle.
    Copied { revert_after: Duration },
}

/// Feed the clipboard result in; `Ok` swaps the label, `Err` means the
/// caller falls back to the legacy select-and-copy path.
pub fn copy_feedback(result: Result<(), ()>) -> CopyLabel {
    match result {
        Ok(()) => CopyLabel::Copied { revert_after: COPY_CONFIRM },
        Err(()) => CopyLabel::Idle,
    }
}
