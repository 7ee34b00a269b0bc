//! Urgency classification and ranking.
//!
//! Tiers:
//! - urgent: overdue, or inside the urgent window
//! - upcoming: inside the planning window
//! - reference: far out, no deadline, or archived
//!
//! A record can carry two deadlines (return, warranty). Each is classified with
//! its own thresholds and the higher tier wins; on a tie the return deadline wins.
//!
//! Every collection operation takes `today` once and classifies each record
//! exactly once. Sorting is stable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::dates::days_until;
use crate::purchase::{Deadlines, PurchaseStatus};

/// Ordered highest priority first: `Urgent < Upcoming < Reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    Urgent = 0,
    Upcoming = 1,
    Reference = 2,
}

impl UrgencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Urgent => "urgent",
            UrgencyTier::Upcoming => "upcoming",
            UrgencyTier::Reference => "reference",
        }
    }
}

impl std::fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineType {
    Return,
    Warranty,
}

impl DeadlineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineType::Return => "return",
            DeadlineType::Warranty => "warranty",
        }
    }
}

impl std::fmt::Display for DeadlineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive day thresholds for one deadline kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub urgent_days: i64,
    pub upcoming_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyThresholds {
    pub return_deadline: TierThresholds,
    pub warranty: TierThresholds,
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            return_deadline: TierThresholds {
                urgent_days: 3,
                upcoming_days: 14,
            },
            warranty: TierThresholds {
                urgent_days: 7,
                upcoming_days: 30,
            },
        }
    }
}

/// Derived per call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgencyClassification {
    pub tier: UrgencyTier,
    pub primary_deadline: Option<DeadlineType>,
    /// Days until the primary deadline; negative means overdue.
    pub days_remaining: Option<i64>,
    pub is_overdue: bool,
}

impl UrgencyClassification {
    fn reference() -> Self {
        Self {
            tier: UrgencyTier::Reference,
            primary_deadline: None,
            days_remaining: None,
            is_overdue: false,
        }
    }

    fn from_deadline(kind: DeadlineType, tier: UrgencyTier, days: i64) -> Self {
        Self {
            tier,
            primary_deadline: Some(kind),
            days_remaining: Some(days),
            is_overdue: days < 0,
        }
    }
}

/// Classify one deadline. Returns the tier and the day count (if any).
pub fn classify_deadline(
    deadline: Option<NaiveDate>,
    thresholds: TierThresholds,
    today: NaiveDate,
) -> (UrgencyTier, Option<i64>) {
    let Some(deadline) = deadline else {
        return (UrgencyTier::Reference, None);
    };

    let days = days_until(deadline, today);
    let tier = if days < 0 || days <= thresholds.urgent_days {
        UrgencyTier::Urgent
    } else if days <= thresholds.upcoming_days {
        UrgencyTier::Upcoming
    } else {
        UrgencyTier::Reference
    };

    (tier, Some(days))
}

pub fn classify_with<R: Deadlines + ?Sized>(
    record: &R,
    today: NaiveDate,
    thresholds: &UrgencyThresholds,
) -> UrgencyClassification {
    if record.status() == PurchaseStatus::Archived {
        return UrgencyClassification::reference();
    }

    let (return_tier, return_days) =
        classify_deadline(record.return_deadline(), thresholds.return_deadline, today);
    let (warranty_tier, warranty_days) =
        classify_deadline(record.warranty_expiry(), thresholds.warranty, today);

    match (return_days, warranty_days) {
        // Return wins ties.
        (Some(r), Some(w)) => {
            if return_tier <= warranty_tier {
                UrgencyClassification::from_deadline(DeadlineType::Return, return_tier, r)
            } else {
                UrgencyClassification::from_deadline(DeadlineType::Warranty, warranty_tier, w)
            }
        }
        (Some(r), None) => UrgencyClassification::from_deadline(DeadlineType::Return, return_tier, r),
        (None, Some(w)) => {
            UrgencyClassification::from_deadline(DeadlineType::Warranty, warranty_tier, w)
        }
        (None, None) => UrgencyClassification::reference(),
    }
}

/// Classify a record against the default thresholds.
pub fn classify<R: Deadlines + ?Sized>(record: &R, today: NaiveDate) -> UrgencyClassification {
    classify_with(record, today, &UrgencyThresholds::default())
}

pub fn urgency_tier<R: Deadlines + ?Sized>(record: &R, today: NaiveDate) -> UrgencyTier {
    classify(record, today).tier
}

/// Ranking key: tier first, then days remaining, records without a day count last.
fn compare_classifications(a: &UrgencyClassification, b: &UrgencyClassification) -> Ordering {
    a.tier.cmp(&b.tier).then_with(|| match (a.days_remaining, b.days_remaining) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Classify each record once, then stable-sort on the classification.
fn ranked<'a, R: Deadlines>(
    records: &'a [R],
    today: NaiveDate,
    thresholds: &UrgencyThresholds,
) -> Vec<(UrgencyClassification, &'a R)> {
    let mut keyed: Vec<(UrgencyClassification, &R)> = records
        .iter()
        .map(|r| (classify_with(r, today, thresholds), r))
        .collect();

    // `sort_by` is stable: equal keys keep input order.
    keyed.sort_by(|(a, _), (b, _)| compare_classifications(a, b));
    keyed
}

pub fn sort_by_urgency_with<R: Deadlines + Clone>(
    records: &[R],
    today: NaiveDate,
    thresholds: &UrgencyThresholds,
) -> Vec<R> {
    ranked(records, today, thresholds)
        .into_iter()
        .map(|(_, r)| r.clone())
        .collect()
}

/// Stable sort: urgent first, then upcoming, then reference; soonest first within a tier.
pub fn sort_by_urgency<R: Deadlines + Clone>(records: &[R], today: NaiveDate) -> Vec<R> {
    sort_by_urgency_with(records, today, &UrgencyThresholds::default())
}

/// Records partitioned by tier, each group in urgency order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyGroups<R> {
    pub urgent: Vec<R>,
    pub upcoming: Vec<R>,
    pub reference: Vec<R>,
}

impl<R> Default for UrgencyGroups<R> {
    fn default() -> Self {
        Self {
            urgent: Vec::new(),
            upcoming: Vec::new(),
            reference: Vec::new(),
        }
    }
}

impl<R> UrgencyGroups<R> {
    pub fn get(&self, tier: UrgencyTier) -> &[R] {
        match tier {
            UrgencyTier::Urgent => &self.urgent,
            UrgencyTier::Upcoming => &self.upcoming,
            UrgencyTier::Reference => &self.reference,
        }
    }

    pub fn len(&self) -> usize {
        self.urgent.len() + self.upcoming.len() + self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate groups in tier order.
    pub fn iter(&self) -> impl Iterator<Item = (UrgencyTier, &[R])> {
        [UrgencyTier::Urgent, UrgencyTier::Upcoming, UrgencyTier::Reference]
            .into_iter()
            .map(move |t| (t, self.get(t)))
    }
}

pub fn group_by_urgency_with<R: Deadlines + Clone>(
    records: &[R],
    today: NaiveDate,
    thresholds: &UrgencyThresholds,
) -> UrgencyGroups<R> {
    // A globally sorted sequence is already sorted within each tier.
    let mut groups = UrgencyGroups::default();
    for (c, r) in ranked(records, today, thresholds) {
        match c.tier {
            UrgencyTier::Urgent => groups.urgent.push(r.clone()),
            UrgencyTier::Upcoming => groups.upcoming.push(r.clone()),
            UrgencyTier::Reference => groups.reference.push(r.clone()),
        }
    }

    groups
}

pub fn group_by_urgency<R: Deadlines + Clone>(records: &[R], today: NaiveDate) -> UrgencyGroups<R> {
    group_by_urgency_with(records, today, &UrgencyThresholds::default())
}

pub fn filter_urgent_with<R: Deadlines + Clone>(
    records: &[R],
    today: NaiveDate,
    thresholds: &UrgencyThresholds,
) -> Vec<R> {
    ranked(records, today, thresholds)
        .into_iter()
        .filter(|(c, _)| c.tier == UrgencyTier::Urgent)
        .map(|(_, r)| r.clone())
        .collect()
}

/// Urgent records only, in urgency order.
pub fn filter_urgent<R: Deadlines + Clone>(records: &[R], today: NaiveDate) -> Vec<R> {
    filter_urgent_with(records, today, &UrgencyThresholds::default())
}

pub fn count_urgent_with<R: Deadlines>(
    records: &[R],
    today: NaiveDate,
    thresholds: &UrgencyThresholds,
) -> usize {
    records
        .iter()
        .filter(|r| classify_with(*r, today, thresholds).tier == UrgencyTier::Urgent)
        .count()
}

pub fn count_urgent<R: Deadlines>(records: &[R], today: NaiveDate) -> usize {
    count_urgent_with(records, today, &UrgencyThresholds::default())
}

pub fn has_urgent_items_with<R: Deadlines>(
    records: &[R],
    today: NaiveDate,
    thresholds: &UrgencyThresholds,
) -> bool {
    records
        .iter()
        .any(|r| classify_with(r, today, thresholds).tier == UrgencyTier::Urgent)
}

/// Stops at the first urgent record.
pub fn has_urgent_items<R: Deadlines>(records: &[R], today: NaiveDate) -> bool {
    has_urgent_items_with(records, today, &UrgencyThresholds::default())
}
