use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;

use super::types::MealType;

/// Which preset window the attendance list is narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    Custom,
}

impl DateRange {
    pub fn parse(s: &str) -> Self {
        match s {
            "yesterday" => DateRange::Yesterday,
            "thisWeek" => DateRange::ThisWeek,
            "lastWeek" => DateRange::LastWeek,
            "thisMonth" => DateRange::ThisMonth,
            "custom" => DateRange::Custom,
            _ => DateRange::Today,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Today => "today",
            DateRange::Yesterday => "yesterday",
            DateRange::ThisWeek => "thisWeek",
            DateRange::LastWeek => "lastWeek",
            DateRange::ThisMonth => "thisMonth",
            DateRange::Custom => "custom",
        }
    }
}

/// Sort order of the attendance list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Most recently marked first.
    #[default]
    Recent,
    /// Student name, ascending.
    Name,
    /// Meal type, ascending.
    MealType,
}

impl SortKey {
    pub fn parse(s: &str) -> Self {
        match s {
            "name" => SortKey::Name,
            "mealType" => SortKey::MealType,
            _ => SortKey::Recent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Recent => "recent",
            SortKey::Name => "name",
            SortKey::MealType => "mealType",
        }
    }
}

/// Raw query parameters of the attendance list page and the CSV export.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(rename = "dateRange")]
    pub date_range: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(rename = "mealType")]
    pub meal_type: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FilterError {
    /// `custom` selected but a start or end date is missing or malformed.
    MissingCustomDates,
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::MissingCustomDates => {
                write!(f, "Please pick both a start and an end date for a custom range")
            }
        }
    }
}

/// Validated filter state. Built from form controls / query parameters and
/// serialized back into a query string, so the filter view round-trips
/// through navigation unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub range: DateRange,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// `None` means "all meals".
    pub meal: Option<MealType>,
    pub sort: SortKey,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            range: DateRange::Today,
            start_date: None,
            end_date: None,
            meal: None,
            sort: SortKey::Recent,
        }
    }
}

impl FilterState {
    pub fn from_params(params: &FilterParams) -> Result<Self, FilterError> {
        let range = DateRange::parse(params.date_range.as_deref().unwrap_or("today"));

        let parse_date =
            |s: &Option<String>| s.as_deref().and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let start_date = parse_date(&params.start_date);
        let end_date = parse_date(&params.end_date);

        if range == DateRange::Custom && (start_date.is_none() || end_date.is_none()) {
            return Err(FilterError::MissingCustomDates);
        }

        let meal = params
            .meal_type
            .as_deref()
            .filter(|m| *m != "all")
            .and_then(MealType::parse);
        let sort = SortKey::parse(params.sort.as_deref().unwrap_or("recent"));

        Ok(FilterState {
            range,
            // Dates only travel with a custom range.
            start_date: if range == DateRange::Custom { start_date } else { None },
            end_date: if range == DateRange::Custom { end_date } else { None },
            meal,
            sort,
        })
    }

    /// Serialize back into the query string the page navigates with.
    pub fn to_query_string(&self) -> String {
        let mut parts = vec![
            format!("dateRange={}", self.range.as_str()),
            format!(
                "mealType={}",
                self.meal.map(|m| m.as_str()).unwrap_or("all")
            ),
            format!("sort={}", self.sort.as_str()),
        ];
        if self.range == DateRange::Custom {
            if let Some(start) = self.start_date {
                parts.insert(1, format!("startDate={}", start.format("%Y-%m-%d")));
            }
            if let Some(end) = self.end_date {
                parts.insert(2, format!("endDate={}", end.format("%Y-%m-%d")));
            }
        }
        parts.join("&")
    }

    /// Resolve the selected range into concrete inclusive bounds.
    /// Weeks start on Monday, matching the roster's expectations.
    pub fn resolve_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self.range {
            DateRange::Today => (today, today),
            DateRange::Yesterday => {
                let y = today - Duration::days(1);
                (y, y)
            }
            DateRange::ThisWeek => {
                let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (start, today)
            }
            DateRange::LastWeek => {
                let end =
                    today - Duration::days(today.weekday().num_days_from_monday() as i64 + 1);
                (end - Duration::days(6), end)
            }
            DateRange::ThisMonth => {
                let start = today.with_day(1).unwrap_or(today);
                (start, today)
            }
            DateRange::Custom => match (self.start_date, self.end_date) {
                (Some(start), Some(end)) => (start, end),
                _ => (today, today),
            },
        }
    }

    // Form-control state helpers for the template.

    pub fn meal_value(&self) -> &'static str {
        self.meal.map(|m| m.as_str()).unwrap_or("all")
    }

    pub fn start_value(&self) -> String {
        self.start_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn end_value(&self) -> String {
        self.end_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}
