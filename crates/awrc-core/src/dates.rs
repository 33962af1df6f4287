//! Report date handling.
//!
//! The backend takes month parameters as `YYYYMM` and day parameters as
//! `YYYYMMDD`. Month pickers produce `MM-YYYY`; availability responses carry
//! dates in whatever form the server serializer chose, so
//! [`parse_wire_date`] is deliberately lenient.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("date range ending {end} reaches past today ({today})")]
    InFuture { end: NaiveDate, today: NaiveDate },

    #[error("unrecognised date \"{0}\"")]
    Unparseable(String),
}

/// Availability bucket size requested from `/dataavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    #[default]
    Month,
}

impl Granularity {
    #[must_use]
    pub fn as_param(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
        }
    }

    /// Anything other than `day` means monthly, matching the server default.
    #[must_use]
    pub fn from_param(s: &str) -> Self {
        if s.eq_ignore_ascii_case("day") {
            Granularity::Day
        } else {
            Granularity::Month
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_param())
    }
}

/// An inclusive date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [`DateRangeError::StartAfterEnd`] when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// # Errors
    ///
    /// Returns [`DateRangeError::InFuture`] when either bound is after `today`.
    pub fn ensure_not_future(&self, today: NaiveDate) -> Result<(), DateRangeError> {
        if self.start > today || self.end > today {
            return Err(DateRangeError::InFuture {
                end: self.end,
                today,
            });
        }
        Ok(())
    }

    /// `(YYYYMM, YYYYMM)` for the export endpoints.
    #[must_use]
    pub fn month_params(&self) -> (String, String) {
        (
            self.start.format("%Y%m").to_string(),
            self.end.format("%Y%m").to_string(),
        )
    }

    /// `(YYYYMMDD, YYYYMMDD)` for report generation and row queries.
    #[must_use]
    pub fn day_params(&self) -> (String, String) {
        (
            self.start.format("%Y%m%d").to_string(),
            self.end.format("%Y%m%d").to_string(),
        )
    }

    /// Whether the range sits inside the optional availability bounds.
    #[must_use]
    pub fn within(&self, min: Option<NaiveDate>, max: Option<NaiveDate>) -> bool {
        min.is_none_or(|m| self.start >= m) && max.is_none_or(|m| self.end <= m)
    }
}

/// Parses a month picker value into the first day of that month.
///
/// Accepts `MM-YYYY`, `YYYY-MM` and `YYYYMM`.
///
/// # Errors
///
/// Returns [`DateRangeError::Unparseable`] for any other shape.
pub fn parse_month(s: &str) -> Result<NaiveDate, DateRangeError> {
    let s = s.trim();
    let unparseable = || DateRangeError::Unparseable(s.to_owned());
    if !s.is_ascii() {
        return Err(unparseable());
    }

    let (year, month) = match s.split_once('-') {
        Some((a, b)) if a.len() == 2 && b.len() == 4 => (b, a),
        Some((a, b)) if a.len() == 4 && b.len() == 2 => (a, b),
        None if s.len() == 6 => (&s[..4], &s[4..]),
        _ => return Err(unparseable()),
    };

    ymd(year, month, "01").ok_or_else(unparseable)
}

/// Parses a day value: `YYYY-MM-DD` or `YYYYMMDD`.
///
/// # Errors
///
/// Returns [`DateRangeError::Unparseable`] for any other shape.
pub fn parse_day(s: &str) -> Result<NaiveDate, DateRangeError> {
    let s = s.trim();
    if !s.is_ascii() {
        return Err(DateRangeError::Unparseable(s.to_owned()));
    }
    let parsed = match s.len() {
        10 if s.as_bytes()[4] == b'-' && s.as_bytes()[7] == b'-' => {
            ymd(&s[..4], &s[5..7], &s[8..])
        }
        8 => ymd(&s[..4], &s[4..6], &s[6..]),
        _ => None,
    };
    parsed.ok_or_else(|| DateRangeError::Unparseable(s.to_owned()))
}

/// Best-effort parse of a date as serialized by the reporting server.
///
/// Handles ISO dates and timestamps, compact `YYYYMMDD`/`YYYYMM`, and the
/// `Jan 1, 2014 12:00:00 AM` form.
#[must_use]
pub fn parse_wire_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(Ok(d)) = s.get(..10).map(parse_day) {
        return Some(d);
    }
    if let Ok(d) = parse_day(s) {
        return Some(d);
    }
    if let Ok(d) = parse_month(s) {
        return Some(d);
    }
    NaiveDateTime::parse_from_str(s, "%b %d, %Y %I:%M:%S %p")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(s, "%b %d, %Y"))
        .ok()
}

/// Default onboarding window: first of the month a year ago up to the first
/// of the current month.
#[must_use]
pub fn onboarding_default_range(today: NaiveDate) -> DateRange {
    let end = today.with_day(1).unwrap_or(today);
    let start = end.checked_sub_months(Months::new(12)).unwrap_or(end);
    DateRange { start, end }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    if ![year, month, day]
        .iter()
        .all(|p| p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let err = DateRange::new(d(2024, 3, 1), d(2024, 2, 1)).unwrap_err();
        assert!(matches!(err, DateRangeError::StartAfterEnd { .. }));
    }

    #[test]
    fn range_allows_single_day() {
        assert!(DateRange::new(d(2024, 3, 1), d(2024, 3, 1)).is_ok());
    }

    #[test]
    fn future_ranges_are_rejected() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 6, 1)).unwrap();
        assert!(range.ensure_not_future(d(2024, 5, 31)).is_err());
        assert!(range.ensure_not_future(d(2024, 6, 1)).is_ok());
    }

    #[test]
    fn params_use_compact_formats() {
        let range = DateRange::new(d(2024, 1, 5), d(2024, 11, 30)).unwrap();
        assert_eq!(
            range.month_params(),
            ("202401".to_string(), "202411".to_string())
        );
        assert_eq!(
            range.day_params(),
            ("20240105".to_string(), "20241130".to_string())
        );
    }

    #[test]
    fn within_respects_optional_bounds() {
        let range = DateRange::new(d(2024, 2, 1), d(2024, 4, 1)).unwrap();
        assert!(range.within(None, None));
        assert!(range.within(Some(d(2024, 1, 1)), Some(d(2024, 4, 1))));
        assert!(!range.within(Some(d(2024, 3, 1)), None));
        assert!(!range.within(None, Some(d(2024, 3, 31))));
    }

    #[test]
    fn parse_month_accepts_picker_and_compact_forms() {
        assert_eq!(parse_month("03-2024").unwrap(), d(2024, 3, 1));
        assert_eq!(parse_month("2024-03").unwrap(), d(2024, 3, 1));
        assert_eq!(parse_month("202403").unwrap(), d(2024, 3, 1));
        assert!(parse_month("13-2024").is_err());
        assert!(parse_month("March").is_err());
    }

    #[test]
    fn parse_day_accepts_dashed_and_compact_forms() {
        assert_eq!(parse_day("2024-02-29").unwrap(), d(2024, 2, 29));
        assert_eq!(parse_day("20240229").unwrap(), d(2024, 2, 29));
        assert!(parse_day("2023-02-29").is_err());
    }

    #[test]
    fn wire_dates_in_server_formats() {
        assert_eq!(parse_wire_date("2014-01-01T00:00:00Z"), Some(d(2014, 1, 1)));
        assert_eq!(parse_wire_date("201402"), Some(d(2014, 2, 1)));
        assert_eq!(
            parse_wire_date("Jan 1, 2014 12:00:00 AM"),
            Some(d(2014, 1, 1))
        );
        assert_eq!(parse_wire_date("garbage"), None);
    }

    #[test]
    fn onboarding_range_spans_previous_year() {
        let range = onboarding_default_range(d(2024, 5, 17));
        assert_eq!(range.start(), d(2023, 5, 1));
        assert_eq!(range.end(), d(2024, 5, 1));
    }

    #[test]
    fn granularity_defaults_to_month() {
        assert_eq!(Granularity::from_param("day"), Granularity::Day);
        assert_eq!(Granularity::from_param("monthly"), Granularity::Month);
        assert_eq!(Granularity::Month.as_param(), "month");
    }
}
