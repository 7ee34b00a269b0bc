//! JSON backup export/import.
//!
//! Import is merge-only: every entry becomes a brand new purchase with a
//! fresh id and deadlines recomputed from its date and windows.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use locker_core::{NewPurchase, Purchase, PurchaseStatus, PurchaseUpdate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::store::PurchaseStore;

pub const BACKUP_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    pub version: u32,
    pub export_date: DateTime<Utc>,
    pub purchases: Vec<Purchase>,
}

/// Raw shape used on import so one bad entry does not sink the file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBackup {
    version: u32,
    #[serde(default)]
    purchases: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    /// Position in the backup's purchase array.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: Vec<ImportFailure>,
}

pub fn build_backup(store: &PurchaseStore, now: DateTime<Utc>) -> BackupData {
    BackupData {
        version: BACKUP_VERSION,
        export_date: now,
        purchases: store.all().to_vec(),
    }
}

/// Write every purchase (active and archived) to `path`.
pub fn export_backup(store: &PurchaseStore, path: &Path, now: DateTime<Utc>) -> Result<usize> {
    let data = build_backup(store, now);
    let json = serde_json::to_string_pretty(&data).context("serialize backup")?;
    fs::write(path, json).with_context(|| format!("write backup {}", path.display()))?;
    info!(path = %path.display(), count = data.purchases.len(), "exported backup");
    Ok(data.purchases.len())
}

/// Rebuild an imported entry as a new purchase. Archived entries stay archived.
fn recreate(id: String, old: Purchase, now: DateTime<Utc>) -> Purchase {
    let status = old.status;
    let input = NewPurchase {
        name: old.name,
        store: old.store,
        price: old.price,
        currency: old.currency,
        purchase_date: old.purchase_date,
        return_window_days: old.return_window_days,
        warranty_months: old.warranty_months,
        serial_number: old.serial_number,
        notes: old.notes,
    };
    let mut p = Purchase::create(id, input, now);

    // Entries without a window keep whatever deadline they were exported with.
    if p.return_deadline.is_none() {
        p.return_deadline = old.return_deadline;
    }
    if p.warranty_expiry.is_none() {
        p.warranty_expiry = old.warranty_expiry;
    }

    if status == PurchaseStatus::Archived {
        p = p.apply_update(&PurchaseUpdate::archive(), now);
    }
    p
}

/// Merge backup JSON into the store.
///
/// Rejects unsupported versions outright. Entries that fail to parse are
/// reported and skipped; the rest are written in one save.
pub fn import_backup_str(
    store: &mut PurchaseStore,
    json: &str,
    now: DateTime<Utc>,
) -> Result<ImportReport> {
    let raw: RawBackup = serde_json::from_str(json).context("parse backup")?;
    if raw.version != BACKUP_VERSION {
        bail!(
            "unsupported backup version {} (expected {})",
            raw.version,
            BACKUP_VERSION
        );
    }

    let mut report = ImportReport::default();
    let mut fresh = Vec::new();

    for (index, value) in raw.purchases.into_iter().enumerate() {
        match serde_json::from_value::<Purchase>(value) {
            Ok(old) => fresh.push(recreate(uuid::Uuid::new_v4().to_string(), old, now)),
            Err(e) => {
                warn!(index, error = %e, "skipping backup entry");
                report.failed.push(ImportFailure {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }

    report.imported = store.insert_many(fresh)?;
    info!(imported = report.imported, failed = report.failed.len(), "imported backup");
    Ok(report)
}

pub fn import_backup(
    store: &mut PurchaseStore,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<ImportReport> {
    let json =
        fs::read_to_string(path).with_context(|| format!("read backup {}", path.display()))?;
    import_backup_str(store, &json, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_rejects_other_versions() {
        let dir = TempDir::new().unwrap();
        let mut s = PurchaseStore::open(dir.path().join("p.json")).unwrap();
        let err = import_backup_str(&mut s, r#"{"version": 2, "purchases": []}"#, now())
            .unwrap_err()
            .to_string();
        assert!(err.contains("unsupported backup version 2"));
        assert!(s.is_empty());
    }

    #[test]
    fn test_bad_entries_are_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut s = PurchaseStore::open(dir.path().join("p.json")).unwrap();
        let json = r#"{
            "version": 1,
            "exportDate": "2026-02-01T00:00:00Z",
            "purchases": [
                {"id": "a", "name": "Kettle", "purchaseDate": "2026-02-01",
                 "returnWindowDays": 30, "createdAt": "2026-02-01T00:00:00Z",
                 "updatedAt": "2026-02-01T00:00:00Z"},
                {"id": "b", "name": "Broken", "purchaseDate": "not-a-date"}
            ]
        }"#;
        let report = import_backup_str(&mut s, json, now()).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);

        let p = &s.all()[0];
        assert_ne!(p.id, "a");
        assert_eq!(p.return_deadline, Some(d(2026, 3, 3)));
        assert_eq!(p.created_at, now());
    }

    #[test]
    fn test_archived_entries_stay_archived() {
        let dir = TempDir::new().unwrap();
        let mut s = PurchaseStore::open(dir.path().join("p.json")).unwrap();
        let p = s
            .create(NewPurchase::new("Lamp", d(2026, 1, 1)), now())
            .unwrap();
        s.archive(&p.id, now()).unwrap();

        let json = serde_json::to_string(&build_backup(&s, now())).unwrap();
        let mut other = PurchaseStore::open(dir.path().join("q.json")).unwrap();
        import_backup_str(&mut other, &json, now()).unwrap();
        assert!(other.all()[0].is_archived());
    }
}
