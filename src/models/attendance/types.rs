use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The two meals a mess serves. Stored lowercase in the database and in
/// every wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Lunch,
    Dinner,
}

impl MealType {
    /// Infer the meal being served from the local hour of day.
    /// Anything before 15:00 counts as lunch; 15:00 itself is dinner.
    pub fn for_hour(hour: u32) -> Self {
        if hour >= 15 { MealType::Dinner } else { MealType::Lunch }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }

    /// Capitalized form for table badges and CSV export.
    pub fn label(&self) -> &'static str {
        match self {
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            _ => None,
        }
    }
}

/// An attendance row joined with its student, as listed and exported.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub timestamp: NaiveDateTime,
    pub method: String,
    pub marked_by: String,
}

impl AttendanceRecord {
    /// 12-hour display form of the marking time, e.g. `1:05 PM`.
    pub fn time_display(&self) -> String {
        self.timestamp.format("%-I:%M %p").to_string()
    }

    pub fn date_display(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Data for inserting one attendance row.
pub struct NewAttendance<'a> {
    pub student_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub method: &'a str,
    pub marked_by: &'a str,
    pub session_id: Option<i64>,
}
