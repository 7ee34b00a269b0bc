//! Purchase model: the persisted entity and the narrow view the urgency engine reads.
//!
//! Storage (JSON file, backups) is a separate layer in `locker-store`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::{compute_return_deadline, compute_warranty_expiry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Active,
    Archived,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Active => "active",
            PurchaseStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(PurchaseStatus::Active),
            "archived" => Ok(PurchaseStatus::Archived),
            other => anyhow::bail!("unknown purchase status: {other}"),
        }
    }
}

/// What the urgency engine needs from a record. Everything else is ignored.
pub trait Deadlines {
    fn status(&self) -> PurchaseStatus;
    fn return_deadline(&self) -> Option<NaiveDate>;
    fn warranty_expiry(&self) -> Option<NaiveDate>;
}

impl<T: Deadlines + ?Sized> Deadlines for &T {
    fn status(&self) -> PurchaseStatus {
        (**self).status()
    }

    fn return_deadline(&self) -> Option<NaiveDate> {
        (**self).return_deadline()
    }

    fn warranty_expiry(&self) -> Option<NaiveDate> {
        (**self).warranty_expiry()
    }
}

/// Minimal tagged record: the fields the engine classifies on, plus identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeadlineRecord {
    pub id: String,
    pub status: PurchaseStatus,
    #[serde(default)]
    pub return_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub warranty_expiry: Option<NaiveDate>,
}

impl DeadlineRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: PurchaseStatus::Active,
            return_deadline: None,
            warranty_expiry: None,
        }
    }

    pub fn with_return_deadline(mut self, deadline: NaiveDate) -> Self {
        self.return_deadline = Some(deadline);
        self
    }

    pub fn with_warranty_expiry(mut self, expiry: NaiveDate) -> Self {
        self.warranty_expiry = Some(expiry);
        self
    }

    pub fn archived(mut self) -> Self {
        self.status = PurchaseStatus::Archived;
        self
    }
}

impl Deadlines for DeadlineRecord {
    fn status(&self) -> PurchaseStatus {
        self.status
    }

    fn return_deadline(&self) -> Option<NaiveDate> {
        self.return_deadline
    }

    fn warranty_expiry(&self) -> Option<NaiveDate> {
        self.warranty_expiry
    }
}

/// A tracked purchase.
///
/// Serialized in camelCase so backups stay readable by older exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,

    pub purchase_date: NaiveDate,

    /// Days; `None` means no return window is tracked.
    #[serde(default)]
    pub return_window_days: Option<u32>,
    #[serde(default)]
    pub return_deadline: Option<NaiveDate>,

    #[serde(default)]
    pub warranty_months: Option<u32>,
    #[serde(default)]
    pub warranty_expiry: Option<NaiveDate>,

    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub status: PurchaseStatus,

    /// Identifiers of reminders projected for this purchase.
    #[serde(default)]
    pub reminder_ids: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deadlines for Purchase {
    fn status(&self) -> PurchaseStatus {
        self.status
    }

    fn return_deadline(&self) -> Option<NaiveDate> {
        self.return_deadline
    }

    fn warranty_expiry(&self) -> Option<NaiveDate> {
        self.warranty_expiry
    }
}

pub const DEFAULT_CURRENCY: &str = "USD";

/// A zero window means "not tracked", same as `None`.
fn derive_return_deadline(purchase_date: NaiveDate, window_days: Option<u32>) -> Option<NaiveDate> {
    window_days
        .filter(|d| *d > 0)
        .map(|d| compute_return_deadline(purchase_date, d))
}

fn derive_warranty_expiry(purchase_date: NaiveDate, months: Option<u32>) -> Option<NaiveDate> {
    months
        .filter(|m| *m > 0)
        .map(|m| compute_warranty_expiry(purchase_date, m))
}

/// Deadline after an update: derived when a window is in effect, cleared
/// when the update removes the window, otherwise left as stored. Imported
/// records may carry a deadline with no window behind it.
fn merge_deadline(
    existing: Option<NaiveDate>,
    window_update: Option<Option<u32>>,
    derived: Option<NaiveDate>,
) -> Option<NaiveDate> {
    if derived.is_some() {
        return derived;
    }
    match window_update {
        Some(None) | Some(Some(0)) => None,
        _ => existing,
    }
}

/// Input for creating a purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub name: String,
    pub store: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub purchase_date: NaiveDate,
    pub return_window_days: Option<u32>,
    pub warranty_months: Option<u32>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

impl NewPurchase {
    pub fn new(name: impl Into<String>, purchase_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            store: None,
            price: None,
            currency: None,
            purchase_date,
            return_window_days: None,
            warranty_months: None,
            serial_number: None,
            notes: None,
        }
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_return_window(mut self, days: u32) -> Self {
        self.return_window_days = Some(days);
        self
    }

    pub fn with_warranty_months(mut self, months: u32) -> Self {
        self.warranty_months = Some(months);
        self
    }

    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update. For nullable fields the outer `Option` means "leave as is"
/// and `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseUpdate {
    pub name: Option<String>,
    pub store: Option<Option<String>>,
    pub price: Option<Option<f64>>,
    pub currency: Option<Option<String>>,
    pub purchase_date: Option<NaiveDate>,
    pub return_window_days: Option<Option<u32>>,
    pub warranty_months: Option<Option<u32>>,
    pub serial_number: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<PurchaseStatus>,
}

impl PurchaseUpdate {
    pub fn archive() -> Self {
        Self {
            status: Some(PurchaseStatus::Archived),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Purchase {
    /// Build a new active purchase, deriving both deadlines.
    pub fn create(id: impl Into<String>, input: NewPurchase, now: DateTime<Utc>) -> Self {
        let return_deadline = derive_return_deadline(input.purchase_date, input.return_window_days);
        let warranty_expiry = derive_warranty_expiry(input.purchase_date, input.warranty_months);

        Self {
            id: id.into(),
            name: input.name,
            store: input.store,
            price: input.price,
            currency: input.currency.or_else(|| Some(DEFAULT_CURRENCY.to_string())),
            purchase_date: input.purchase_date,
            return_window_days: input.return_window_days,
            return_deadline,
            warranty_months: input.warranty_months,
            warranty_expiry,
            serial_number: input.serial_number,
            notes: input.notes,
            status: PurchaseStatus::Active,
            reminder_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch, recomputing deadlines from the merged date and windows.
    pub fn apply_update(&self, update: &PurchaseUpdate, now: DateTime<Utc>) -> Self {
        let purchase_date = update.purchase_date.unwrap_or(self.purchase_date);
        let return_window_days = update
            .return_window_days
            .unwrap_or(self.return_window_days);
        let warranty_months = update.warranty_months.unwrap_or(self.warranty_months);

        let return_deadline = merge_deadline(
            self.return_deadline,
            update.return_window_days,
            derive_return_deadline(purchase_date, return_window_days),
        );
        let warranty_expiry = merge_deadline(
            self.warranty_expiry,
            update.warranty_months,
            derive_warranty_expiry(purchase_date, warranty_months),
        );

        Self {
            id: self.id.clone(),
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            store: update.store.clone().unwrap_or_else(|| self.store.clone()),
            price: update.price.unwrap_or(self.price),
            currency: update.currency.clone().unwrap_or_else(|| self.currency.clone()),
            purchase_date,
            return_window_days,
            return_deadline,
            warranty_months,
            warranty_expiry,
            serial_number: update
                .serial_number
                .clone()
                .unwrap_or_else(|| self.serial_number.clone()),
            notes: update.notes.clone().unwrap_or_else(|| self.notes.clone()),
            status: update.status.unwrap_or(self.status),
            reminder_ids: self.reminder_ids.clone(),
            created_at: self.created_at,
            updated_at: now,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == PurchaseStatus::Archived
    }

    pub fn to_deadline_record(&self) -> DeadlineRecord {
        DeadlineRecord {
            id: self.id.clone(),
            status: self.status,
            return_deadline: self.return_deadline,
            warranty_expiry: self.warranty_expiry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_create_derives_deadlines() {
        let input = NewPurchase::new("Headphones", d(2026, 1, 8))
            .with_store("Best Buy")
            .with_return_window(30)
            .with_warranty_months(12);
        let p = Purchase::create("p1", input, now());

        assert_eq!(p.return_deadline, Some(d(2026, 2, 7)));
        assert_eq!(p.warranty_expiry, Some(d(2027, 1, 8)));
        assert_eq!(p.currency.as_deref(), Some("USD"));
        assert_eq!(p.status, PurchaseStatus::Active);
        assert_eq!(p.created_at, p.updated_at);
    }

    #[test]
    fn test_create_zero_window_tracks_nothing() {
        let input = NewPurchase::new("Socks", d(2026, 1, 8))
            .with_return_window(0)
            .with_warranty_months(0);
        let p = Purchase::create("p2", input, now());
        assert_eq!(p.return_deadline, None);
        assert_eq!(p.warranty_expiry, None);
    }

    #[test]
    fn test_update_recomputes_when_purchase_date_changes() {
        let p = Purchase::create(
            "p3",
            NewPurchase::new("Lamp", d(2026, 1, 8)).with_return_window(14),
            now(),
        );
        let later = now() + chrono::Duration::hours(1);
        let up = PurchaseUpdate {
            purchase_date: Some(d(2026, 1, 10)),
            ..PurchaseUpdate::default()
        };
        let p2 = p.apply_update(&up, later);
        assert_eq!(p2.return_deadline, Some(d(2026, 1, 24)));
        assert_eq!(p2.updated_at, later);
        assert_eq!(p2.created_at, p.created_at);
    }

    #[test]
    fn test_update_clears_window() {
        let p = Purchase::create(
            "p4",
            NewPurchase::new("Chair", d(2026, 1, 8))
                .with_return_window(30)
                .with_warranty_months(6),
            now(),
        );
        let up = PurchaseUpdate {
            return_window_days: Some(None),
            ..PurchaseUpdate::default()
        };
        let p2 = p.apply_update(&up, now());
        assert_eq!(p2.return_deadline, None);
        assert_eq!(p2.return_window_days, None);
        assert_eq!(p2.warranty_expiry, Some(d(2026, 7, 8)));
    }

    #[test]
    fn test_update_keeps_windowless_deadline() {
        let mut p = Purchase::create("p7", NewPurchase::new("Speaker", d(2026, 1, 8)), now());
        p.return_deadline = Some(d(2026, 2, 7));

        let up = PurchaseUpdate {
            warranty_months: Some(Some(12)),
            ..PurchaseUpdate::default()
        };
        let p2 = p.apply_update(&up, now());
        assert_eq!(p2.return_deadline, Some(d(2026, 2, 7)));
        assert_eq!(p2.warranty_expiry, Some(d(2027, 1, 8)));

        let moved = PurchaseUpdate {
            purchase_date: Some(d(2026, 1, 10)),
            ..PurchaseUpdate::default()
        };
        assert_eq!(p.apply_update(&moved, now()).return_deadline, Some(d(2026, 2, 7)));

        let cleared = PurchaseUpdate {
            return_window_days: Some(Some(0)),
            ..PurchaseUpdate::default()
        };
        assert_eq!(p.apply_update(&cleared, now()).return_deadline, None);
    }

    #[test]
    fn test_update_keeps_untouched_fields() {
        let p = Purchase::create(
            "p5",
            NewPurchase::new("Desk", d(2026, 1, 8)).with_store("IKEA"),
            now(),
        );
        let p2 = p.apply_update(&PurchaseUpdate::archive(), now());
        assert_eq!(p2.store.as_deref(), Some("IKEA"));
        assert_eq!(p2.name, "Desk");
        assert!(p2.is_archived());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Archived".parse::<PurchaseStatus>().unwrap(), PurchaseStatus::Archived);
        assert!("deleted".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn test_deadline_record_rejects_extra_fields() {
        let ok: DeadlineRecord =
            serde_json::from_str(r#"{"id":"a","status":"active","returnDeadline":"2026-02-07"}"#)
                .unwrap();
        assert_eq!(ok.return_deadline, Some(d(2026, 2, 7)));

        let bad = serde_json::from_str::<DeadlineRecord>(
            r#"{"id":"a","status":"active","name":"extra"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_purchase_json_is_camel_case() {
        let p = Purchase::create(
            "p6",
            NewPurchase::new("Kettle", d(2026, 1, 8)).with_return_window(30),
            now(),
        );
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["purchaseDate"], "2026-01-08");
        assert_eq!(v["returnDeadline"], "2026-02-07");
        assert_eq!(v["status"], "active");
    }
}
