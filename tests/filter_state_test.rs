//! Filter-state tests: query-parameter parsing, the custom-range guard,
//! query-string round-tripping, and date-window resolution.

use chrono::NaiveDate;

use messmate::models::attendance::MealType;
use messmate::models::attendance::filter::{
    DateRange, FilterError, FilterParams, FilterState, SortKey,
};

fn params(
    range: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    meal: Option<&str>,
    sort: Option<&str>,
) -> FilterParams {
    FilterParams {
        date_range: range.map(String::from),
        start_date: start.map(String::from),
        end_date: end.map(String::from),
        meal_type: meal.map(String::from),
        sort: sort.map(String::from),
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn test_defaults_when_no_params() {
    let state = FilterState::from_params(&FilterParams::default()).unwrap();
    assert_eq!(state, FilterState::default());
    assert_eq!(state.range, DateRange::Today);
    assert_eq!(state.meal, None);
    assert_eq!(state.sort, SortKey::Recent);
}

#[test]
fn test_unknown_values_fall_back() {
    let state =
        FilterState::from_params(&params(Some("fortnight"), None, None, Some("brunch"), Some("zodiac")))
            .unwrap();
    assert_eq!(state.range, DateRange::Today);
    assert_eq!(state.meal, None);
    assert_eq!(state.sort, SortKey::Recent);
}

#[test]
fn test_custom_range_requires_both_dates() {
    let missing_end = params(Some("custom"), Some("2026-03-01"), None, None, None);
    assert_eq!(
        FilterState::from_params(&missing_end),
        Err(FilterError::MissingCustomDates)
    );

    let missing_start = params(Some("custom"), None, Some("2026-03-07"), None, None);
    assert_eq!(
        FilterState::from_params(&missing_start),
        Err(FilterError::MissingCustomDates)
    );

    let malformed = params(Some("custom"), Some("not-a-date"), Some("2026-03-07"), None, None);
    assert_eq!(
        FilterState::from_params(&malformed),
        Err(FilterError::MissingCustomDates)
    );
}

#[test]
fn test_query_string_round_trip() {
    let original = FilterState::from_params(&params(
        Some("custom"),
        Some("2026-03-01"),
        Some("2026-03-07"),
        Some("dinner"),
        Some("name"),
    ))
    .unwrap();

    let qs = original.to_query_string();
    let mut reparsed = FilterParams::default();
    for pair in qs.split('&') {
        let (k, v) = pair.split_once('=').unwrap();
        match k {
            "dateRange" => reparsed.date_range = Some(v.to_string()),
            "startDate" => reparsed.start_date = Some(v.to_string()),
            "endDate" => reparsed.end_date = Some(v.to_string()),
            "mealType" => reparsed.meal_type = Some(v.to_string()),
            "sort" => reparsed.sort = Some(v.to_string()),
            other => panic!("unexpected query key {other}"),
        }
    }

    assert_eq!(FilterState::from_params(&reparsed).unwrap(), original);
}

#[test]
fn test_round_trip_drops_dates_outside_custom() {
    let state =
        FilterState::from_params(&params(Some("today"), Some("2026-03-01"), Some("2026-03-07"), None, None))
            .unwrap();
    assert_eq!(state.start_date, None);
    assert!(!state.to_query_string().contains("startDate"));
}

#[test]
fn test_resolve_simple_ranges() {
    // 2026-03-04 is a Wednesday
    let today = date("2026-03-04");

    let mut state = FilterState::default();
    assert_eq!(state.resolve_range(today), (today, today));

    state.range = DateRange::Yesterday;
    assert_eq!(state.resolve_range(today), (date("2026-03-03"), date("2026-03-03")));

    state.range = DateRange::ThisWeek;
    assert_eq!(state.resolve_range(today), (date("2026-03-02"), today));

    state.range = DateRange::LastWeek;
    assert_eq!(state.resolve_range(today), (date("2026-02-23"), date("2026-03-01")));

    state.range = DateRange::ThisMonth;
    assert_eq!(state.resolve_range(today), (date("2026-03-01"), today));
}

#[test]
fn test_resolve_custom_range() {
    let state = FilterState::from_params(&params(
        Some("custom"),
        Some("2026-01-10"),
        Some("2026-01-20"),
        None,
        None,
    ))
    .unwrap();
    assert_eq!(
        state.resolve_range(date("2026-03-04")),
        (date("2026-01-10"), date("2026-01-20"))
    );
}

#[test]
fn test_meal_parsing() {
    let lunch = FilterState::from_params(&params(None, None, None, Some("lunch"), None)).unwrap();
    assert_eq!(lunch.meal, Some(MealType::Lunch));
    assert_eq!(lunch.meal_value(), "lunch");

    let all = FilterState::from_params(&params(None, None, None, Some("all"), None)).unwrap();
    assert_eq!(all.meal, None);
    assert_eq!(all.meal_value(), "all");
}
