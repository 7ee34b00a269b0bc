//! Reminder policy + projection for purchase deadlines.
//!
//! Only computes *when* a reminder should fire. Delivery is someone else's job.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::purchase::Purchase;
use crate::urgency::DeadlineType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderIntent {
    /// Stable per (purchase, deadline, lead): `return-<id>-3d`.
    pub intent_id: String,
    pub purchase_id: String,
    pub deadline_type: DeadlineType,
    pub lead_days: u32,
    pub title: String,
    pub body: String,
    pub send_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderPolicy {
    pub return_lead_days: Vec<u32>,
    pub warranty_lead_days: Vec<u32>,
    /// Local hour of day (0-23) reminders fire at.
    pub send_hour: u32,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            return_lead_days: vec![1, 3, 7],
            warranty_lead_days: vec![7, 14, 30],
            send_hour: 9,
        }
    }
}

fn plural_days(n: u32) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

/// `deadline - lead_days` at `send_hour` local time, in UTC.
///
/// `None` when the local time does not exist (DST gap) or the date underflows.
fn fire_time(deadline: NaiveDate, lead_days: u32, send_hour: u32, tz: Tz) -> Option<DateTime<Utc>> {
    let day = deadline.checked_sub_signed(Duration::days(i64::from(lead_days)))?;
    let time = NaiveTime::from_hms_opt(send_hour.min(23), 0, 0)?;
    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Deterministically project a purchase into reminder intents.
///
/// Archived purchases get none. Slots at or before `now` are skipped.
pub fn project_purchase_reminders(
    purchase: &Purchase,
    now: DateTime<Utc>,
    tz: Tz,
    policy: &ReminderPolicy,
) -> Vec<ReminderIntent> {
    if purchase.is_archived() {
        return vec![];
    }

    let mut out = Vec::new();
    let mut seen = HashSet::new();

    if let Some(deadline) = purchase.return_deadline {
        // Day-of is always scheduled below with its own title.
        for &lead in policy.return_lead_days.iter().filter(|l| **l > 0) {
            let body = format!("{} return window ends in {}", purchase.name, plural_days(lead));
            out.push((DeadlineType::Return, deadline, lead, "Return deadline approaching", body));
        }
        out.push((
            DeadlineType::Return,
            deadline,
            0,
            "Return deadline today",
            format!("{} must be returned today", purchase.name),
        ));
    }

    if let Some(expiry) = purchase.warranty_expiry {
        for &lead in &policy.warranty_lead_days {
            let body = format!("{} warranty expires in {}", purchase.name, plural_days(lead));
            out.push((DeadlineType::Warranty, expiry, lead, "Warranty expiring soon", body));
        }
    }

    out.into_iter()
        .filter_map(|(kind, deadline, lead, title, body)| {
            let intent_id = format!("{}-{}-{}d", kind, purchase.id, lead);
            if !seen.insert(intent_id.clone()) {
                return None;
            }
            let send_at = fire_time(deadline, lead, policy.send_hour, tz)?;
            if send_at <= now {
                debug!(%intent_id, %send_at, "skipping reminder in the past");
                return None;
            }
            Some(ReminderIntent {
                intent_id,
                purchase_id: purchase.id.clone(),
                deadline_type: kind,
                lead_days: lead,
                title: title.to_string(),
                body,
                send_at_utc: send_at,
            })
        })
        .collect()
}
