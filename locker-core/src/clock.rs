//! Host clock: the single source of "today".
//!
//! Callers read the clock once per top-level operation and pass the date down.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

pub trait Clock {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Today's calendar date.
    fn today(&self) -> NaiveDate;
}

/// Wall clock, with "today" taken in an IANA timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    now: DateTime<Utc>,
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            now,
            today: now.with_timezone(&tz).date_naive(),
        }
    }

    /// Pin to local midnight of `today` in `tz`.
    pub fn at_date(today: NaiveDate, tz: Tz) -> Self {
        let now = tz
            .from_local_datetime(&today.and_time(chrono::NaiveTime::MIN))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| today.and_time(chrono::NaiveTime::MIN).and_utc());
        Self { now, today }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_uses_local_date() {
        // 03:00 UTC on Feb 6 is still Feb 5 in Chicago (UTC-6).
        let now = Utc.with_ymd_and_hms(2026, 2, 6, 3, 0, 0).unwrap();
        let clock = FixedClock::new(now, chrono_tz::America::Chicago);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 2, 5).unwrap());
        assert_eq!(clock.now_utc(), now);
    }

    #[test]
    fn test_at_date_is_local_midnight() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        let clock = FixedClock::at_date(day, chrono_tz::America::Chicago);
        assert_eq!(clock.today(), day);
        assert_eq!(clock.now_utc().to_rfc3339(), "2026-02-05T06:00:00+00:00");
    }
}
