//! locker-core: purchase deadlines, urgency tiers, and reminder projection.
//!
//! Everything in this crate is pure: callers supply "today" (see [`clock`]).

pub mod action;
pub mod clock;
pub mod dates;
pub mod defaults;
pub mod purchase;
pub mod reminders;
pub mod urgency;

pub use action::{action_items, ActionItems};
pub use clock::{Clock, FixedClock, SystemClock};
pub use dates::{
    compute_return_deadline, compute_warranty_expiry, days_until, deadline_status, is_due_soon,
    is_overdue, parse_iso_date, DeadlineKind, DeadlineStatus,
};
pub use defaults::{policy_for, store_defaults, StorePolicy, STORE_DEFAULTS, UNIVERSAL_DEFAULTS};
pub use purchase::{
    DeadlineRecord, Deadlines, NewPurchase, Purchase, PurchaseStatus, PurchaseUpdate,
};
pub use reminders::{project_purchase_reminders, ReminderIntent, ReminderPolicy};
pub use urgency::{
    classify, classify_with, count_urgent, filter_urgent, group_by_urgency, has_urgent_items,
    sort_by_urgency, urgency_tier, DeadlineType, TierThresholds, UrgencyClassification,
    UrgencyGroups, UrgencyThresholds, UrgencyTier,
};
