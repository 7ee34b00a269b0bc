//! "Action today" buckets: what needs doing now, independent of urgency tiers.
//!
//! - overdue: active, return deadline already passed
//! - return due soon: active, return deadline within the next 7 days (today included)
//! - warranty expiring soon: active, warranty expiry within the next 30 days

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{is_due_soon, is_overdue};
use crate::purchase::{Deadlines, PurchaseStatus};

pub const RETURN_DUE_SOON_DAYS: u32 = 7;
pub const WARRANTY_EXPIRING_SOON_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItems<R> {
    pub overdue: Vec<R>,
    pub return_due_soon: Vec<R>,
    pub warranty_expiring_soon: Vec<R>,
}

impl<R> ActionItems<R> {
    pub fn total_count(&self) -> usize {
        self.overdue.len() + self.return_due_soon.len() + self.warranty_expiring_soon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }
}

/// Bucket active records by what needs doing. A record may appear in both a
/// return bucket and the warranty bucket. Each bucket is ordered by its
/// deadline ascending, ties in input order.
pub fn action_items<R: Deadlines + Clone>(records: &[R], today: NaiveDate) -> ActionItems<R> {
    let active = || {
        records
            .iter()
            .filter(|r| r.status() == PurchaseStatus::Active)
    };

    let mut overdue: Vec<(NaiveDate, &R)> = active()
        .filter_map(|r| r.return_deadline().map(|d| (d, r)))
        .filter(|(d, _)| is_overdue(*d, today))
        .collect();

    let mut return_due_soon: Vec<(NaiveDate, &R)> = active()
        .filter_map(|r| r.return_deadline().map(|d| (d, r)))
        .filter(|(d, _)| is_due_soon(*d, RETURN_DUE_SOON_DAYS, today))
        .collect();

    let mut warranty_expiring_soon: Vec<(NaiveDate, &R)> = active()
        .filter_map(|r| r.warranty_expiry().map(|d| (d, r)))
        .filter(|(d, _)| is_due_soon(*d, WARRANTY_EXPIRING_SOON_DAYS, today))
        .collect();

    for bucket in [&mut overdue, &mut return_due_soon, &mut warranty_expiring_soon] {
        bucket.sort_by_key(|(d, _)| *d);
    }

    let strip = |v: Vec<(NaiveDate, &R)>| -> Vec<R> { v.into_iter().map(|(_, r)| r.clone()).collect() };

    ActionItems {
        overdue: strip(overdue),
        return_due_soon: strip(return_due_soon),
        warranty_expiring_soon: strip(warranty_expiring_soon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::DeadlineRecord;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 5).unwrap()
    }

    fn in_days(n: i64) -> NaiveDate {
        today() + Duration::days(n)
    }

    #[test]
    fn test_buckets() {
        let records = vec![
            DeadlineRecord::new("late").with_return_deadline(in_days(-2)),
            DeadlineRecord::new("later").with_return_deadline(in_days(-9)),
            DeadlineRecord::new("soon").with_return_deadline(in_days(7)),
            DeadlineRecord::new("today").with_return_deadline(in_days(0)),
            DeadlineRecord::new("far").with_return_deadline(in_days(8)),
            DeadlineRecord::new("warranty")
                .with_return_deadline(in_days(40))
                .with_warranty_expiry(in_days(30)),
            DeadlineRecord::new("archived")
                .with_return_deadline(in_days(-1))
                .archived(),
        ];

        let items = action_items(&records, today());
        let ids = |v: &[DeadlineRecord]| v.iter().map(|r| r.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(&items.overdue), vec!["later", "late"]);
        assert_eq!(ids(&items.return_due_soon), vec!["today", "soon"]);
        assert_eq!(ids(&items.warranty_expiring_soon), vec!["warranty"]);
        assert_eq!(items.total_count(), 5);
    }

    #[test]
    fn test_expired_warranty_is_not_expiring_soon() {
        let records = vec![DeadlineRecord::new("gone").with_warranty_expiry(in_days(-1))];
        assert!(action_items(&records, today()).is_empty());
    }
}
