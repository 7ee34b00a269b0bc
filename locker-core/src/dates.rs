//! Date arithmetic: calendar-date deadlines, free of time-of-day drift.
//!
//! Everything here operates on `NaiveDate`. "Today" is always passed in by the
//! caller (see `crate::clock`) so a whole batch is evaluated against one date.
//! The `*_iso` variants are the `YYYY-MM-DD` string boundary.

use anyhow::{Context, Result};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar-date wire format.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Window used by `deadline_status` for the `soon` bucket.
pub const SOON_WITHIN_DAYS: i64 = 7;

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), ISO_DATE_FORMAT)
        .with_context(|| format!("invalid calendar date '{s}' (expected YYYY-MM-DD)"))
}

pub fn to_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Return deadline = purchase date + `window_days` whole days.
///
/// Saturates at `NaiveDate::MAX` instead of overflowing.
pub fn compute_return_deadline(purchase_date: NaiveDate, window_days: u32) -> NaiveDate {
    purchase_date
        .checked_add_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Warranty expiry = purchase date + `months` calendar months.
///
/// When the target month is shorter than the purchase day-of-month the result
/// clamps to the target month's last day: Jan 31 + 1 month is Feb 28 (or 29).
pub fn compute_warranty_expiry(purchase_date: NaiveDate, months: u32) -> NaiveDate {
    purchase_date
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Signed whole days from `today` to `deadline`. Negative means overdue.
pub fn days_until(deadline: NaiveDate, today: NaiveDate) -> i64 {
    deadline.signed_duration_since(today).num_days()
}

pub fn is_overdue(deadline: NaiveDate, today: NaiveDate) -> bool {
    deadline < today
}

pub fn is_deadline_today(deadline: NaiveDate, today: NaiveDate) -> bool {
    deadline == today
}

/// True iff the deadline is today or in the future and at most `within_days` away.
///
/// Overdue deadlines are never "due soon".
pub fn is_due_soon(deadline: NaiveDate, within_days: u32, today: NaiveDate) -> bool {
    let days = days_until(deadline, today);
    days >= 0 && days <= i64::from(within_days)
}

/// Coarse bucket for a deadline label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineKind {
    Overdue,
    Today,
    Soon,
    Normal,
}

impl DeadlineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineKind::Overdue => "overdue",
            DeadlineKind::Today => "today",
            DeadlineKind::Soon => "soon",
            DeadlineKind::Normal => "normal",
        }
    }
}

impl std::fmt::Display for DeadlineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable deadline label plus its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineStatus {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: DeadlineKind,
}

fn plural_days(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

pub fn deadline_status(deadline: NaiveDate, today: NaiveDate) -> DeadlineStatus {
    let days = days_until(deadline, today);

    if days < 0 {
        return DeadlineStatus {
            text: format!("{} overdue", plural_days(days.abs())),
            kind: DeadlineKind::Overdue,
        };
    }

    if days == 0 {
        return DeadlineStatus {
            text: "Due today".to_string(),
            kind: DeadlineKind::Today,
        };
    }

    let kind = if days <= SOON_WITHIN_DAYS {
        DeadlineKind::Soon
    } else {
        DeadlineKind::Normal
    };

    DeadlineStatus {
        text: format!("{} left", plural_days(days)),
        kind,
    }
}

/// e.g. "January 8, 2026"
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// e.g. "Jan 8"
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

pub fn compute_return_deadline_iso(purchase_date: &str, window_days: u32) -> Result<String> {
    let date = parse_iso_date(purchase_date)?;
    Ok(to_iso_date(compute_return_deadline(date, window_days)))
}

pub fn compute_warranty_expiry_iso(purchase_date: &str, warranty_months: u32) -> Result<String> {
    let date = parse_iso_date(purchase_date)?;
    Ok(to_iso_date(compute_warranty_expiry(date, warranty_months)))
}

pub fn days_until_iso(deadline: &str, today: NaiveDate) -> Result<i64> {
    Ok(days_until(parse_iso_date(deadline)?, today))
}

pub fn is_overdue_iso(deadline: &str, today: NaiveDate) -> Result<bool> {
    Ok(is_overdue(parse_iso_date(deadline)?, today))
}

pub fn is_due_soon_iso(deadline: &str, within_days: u32, today: NaiveDate) -> Result<bool> {
    Ok(is_due_soon(parse_iso_date(deadline)?, within_days, today))
}

pub fn deadline_status_iso(deadline: &str, today: NaiveDate) -> Result<DeadlineStatus> {
    Ok(deadline_status(parse_iso_date(deadline)?, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_return_deadline_30_days() {
        assert_eq!(compute_return_deadline_iso("2026-01-08", 30).unwrap(), "2026-02-07");
        assert_eq!(compute_return_deadline_iso("2026-01-08", 14).unwrap(), "2026-01-22");
    }

    #[test]
    fn test_return_deadline_boundaries() {
        assert_eq!(compute_return_deadline_iso("2026-01-25", 30).unwrap(), "2026-02-24");
        assert_eq!(compute_return_deadline_iso("2025-12-15", 30).unwrap(), "2026-01-14");
    }

    #[test]
    fn test_return_deadline_zero_window_is_purchase_date() {
        assert_eq!(compute_return_deadline(d(2026, 3, 1), 0), d(2026, 3, 1));
    }

    #[test]
    fn test_return_deadline_saturates() {
        assert_eq!(compute_return_deadline(NaiveDate::MAX, 1), NaiveDate::MAX);
    }

    #[test]
    fn test_warranty_expiry_whole_months() {
        assert_eq!(compute_warranty_expiry_iso("2026-01-08", 12).unwrap(), "2027-01-08");
        assert_eq!(compute_warranty_expiry_iso("2026-01-08", 3).unwrap(), "2026-04-08");
        assert_eq!(compute_warranty_expiry_iso("2026-01-08", 24).unwrap(), "2028-01-08");
    }

    #[test]
    fn test_warranty_expiry_clamps_to_month_end() {
        assert_eq!(compute_warranty_expiry_iso("2026-01-31", 1).unwrap(), "2026-02-28");
        assert_eq!(compute_warranty_expiry_iso("2024-01-31", 1).unwrap(), "2024-02-29");
        assert_eq!(compute_warranty_expiry_iso("2026-03-31", 1).unwrap(), "2026-04-30");
        // Clamping does not stick: Feb 29 + 12 lands on Feb 28 of a common year.
        assert_eq!(compute_warranty_expiry_iso("2024-02-29", 12).unwrap(), "2025-02-28");
    }

    #[test]
    fn test_days_until() {
        let today = d(2026, 2, 5);
        assert_eq!(days_until(today, today), 0);
        assert_eq!(days_until(d(2026, 2, 15), today), 10);
        assert_eq!(days_until(d(2026, 1, 31), today), -5);
    }

    #[test]
    fn test_is_overdue() {
        let today = d(2026, 2, 5);
        assert!(!is_overdue(today, today));
        assert!(is_overdue(d(2026, 2, 4), today));
        assert!(!is_overdue(d(2026, 2, 6), today));
    }

    #[test]
    fn test_is_due_soon_excludes_overdue() {
        let today = d(2026, 2, 5);
        assert!(is_due_soon(d(2026, 2, 10), 7, today));
        assert!(is_due_soon(today, 7, today));
        assert!(is_due_soon(d(2026, 2, 12), 7, today));
        assert!(!is_due_soon(d(2026, 2, 15), 7, today));
        assert!(!is_due_soon(d(2026, 2, 4), 7, today));
        assert!(!is_due_soon(d(2025, 2, 4), 7, today));
    }

    #[test]
    fn test_deadline_status_buckets() {
        let today = d(2026, 2, 5);

        let s = deadline_status(d(2026, 2, 2), today);
        assert_eq!(s.kind, DeadlineKind::Overdue);
        assert_eq!(s.text, "3 days overdue");

        let s = deadline_status(d(2026, 2, 4), today);
        assert_eq!(s.text, "1 day overdue");

        let s = deadline_status(today, today);
        assert_eq!(s.kind, DeadlineKind::Today);
        assert_eq!(s.text, "Due today");

        let s = deadline_status(d(2026, 2, 6), today);
        assert_eq!(s.kind, DeadlineKind::Soon);
        assert_eq!(s.text, "1 day left");

        let s = deadline_status(d(2026, 2, 12), today);
        assert_eq!(s.kind, DeadlineKind::Soon);
        assert_eq!(s.text, "7 days left");

        let s = deadline_status(d(2026, 2, 20), today);
        assert_eq!(s.kind, DeadlineKind::Normal);
        assert_eq!(s.text, "15 days left");
    }

    #[test]
    fn test_deadline_status_serializes_kind_as_type() {
        let s = deadline_status(d(2026, 2, 5), d(2026, 2, 5));
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"text":"Due today","type":"today"}"#);
    }

    #[test]
    fn test_format_dates() {
        assert_eq!(format_display_date(d(2026, 1, 8)), "January 8, 2026");
        assert_eq!(format_display_date(d(2026, 12, 25)), "December 25, 2026");
        assert_eq!(format_short_date(d(2026, 1, 8)), "Jan 8");
    }

    #[test]
    fn test_parse_iso_rejects_garbage() {
        assert!(parse_iso_date("2026-13-01").is_err());
        assert!(parse_iso_date("01/08/2026").is_err());
        assert_eq!(parse_iso_date(" 2026-01-08 ").unwrap(), d(2026, 1, 8));
    }
}
