//! JSON-file purchase store.
//!
//! The whole file is loaded into memory on open and rewritten on every
//! mutation: write `<file>.tmp`, fsync, rename over the data file. A failed
//! write leaves both the file and the in-memory state unchanged.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use locker_core::{NewPurchase, Purchase, PurchaseStatus, PurchaseUpdate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    purchases: Vec<Purchase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    ReturnDeadline,
    WarrantyExpiry,
    PurchaseDate,
    #[default]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

/// Filters and ordering for [`PurchaseStore::list`].
///
/// Deadline orderings always put purchases without that deadline last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub status: Option<PurchaseStatus>,
    pub store: Option<String>,
    pub order_by: OrderBy,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurchaseCounts {
    pub total: usize,
    pub active: usize,
    pub archived: usize,
}

#[derive(Debug)]
pub struct PurchaseStore {
    path: PathBuf,
    purchases: Vec<Purchase>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl PurchaseStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!(path = %path.display(), "no store file yet; starting empty");
            return Ok(Self {
                path,
                purchases: Vec::new(),
            });
        }

        let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let file: StoreFile =
            serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        if file.version != STORE_VERSION {
            bail!(
                "unsupported store version {} in {} (expected {})",
                file.version,
                path.display(),
                STORE_VERSION
            );
        }

        debug!(path = %path.display(), count = file.purchases.len(), "loaded store");
        Ok(Self {
            path,
            purchases: file.purchases,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.purchases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty()
    }

    /// All purchases in insertion order.
    pub fn all(&self) -> &[Purchase] {
        &self.purchases
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }

        let file = StoreFile {
            version: STORE_VERSION,
            purchases: self.purchases.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("serialize store")?;

        let tmp = self.path.with_extension("tmp");
        let f = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = BufWriter::new(f);
        w.write_all(json.as_bytes())
            .with_context(|| format!("write {}", tmp.display()))?;
        w.flush()?;
        w.get_ref().sync_all()?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }

    /// Run a mutation; on save failure put the previous state back.
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut Vec<Purchase>) -> T) -> Result<T> {
        let before = self.purchases.clone();
        let out = mutate(&mut self.purchases);
        if let Err(e) = self.save() {
            self.purchases = before;
            return Err(e);
        }
        Ok(out)
    }

    pub fn create(&mut self, input: NewPurchase, now: DateTime<Utc>) -> Result<Purchase> {
        let mut created = self.create_many(vec![input], now)?;
        created
            .pop()
            .context("create_many returned nothing for one input")
    }

    /// Insert several purchases with a single write.
    pub fn create_many(
        &mut self,
        inputs: Vec<NewPurchase>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Purchase>> {
        let created: Vec<Purchase> = inputs
            .into_iter()
            .map(|input| Purchase::create(new_id(), input, now))
            .collect();
        let out = created.clone();
        self.commit(move |all| all.extend(created))?;
        info!(count = out.len(), "created purchases");
        Ok(out)
    }

    /// Insert already-built purchases (e.g. from a backup) with a single write.
    pub fn insert_many(&mut self, purchases: Vec<Purchase>) -> Result<usize> {
        let n = purchases.len();
        self.commit(move |all| all.extend(purchases))?;
        Ok(n)
    }

    pub fn get(&self, id: &str) -> Option<&Purchase> {
        self.purchases.iter().find(|p| p.id == id)
    }

    /// Look up by full id or a unique id prefix.
    pub fn resolve(&self, id_or_prefix: &str) -> Result<&Purchase> {
        if let Some(p) = self.get(id_or_prefix) {
            return Ok(p);
        }
        let mut matches = self
            .purchases
            .iter()
            .filter(|p| p.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(p), None) if !id_or_prefix.is_empty() => Ok(p),
            (Some(_), Some(_)) => bail!("id prefix '{id_or_prefix}' is ambiguous"),
            _ => bail!("no purchase with id '{id_or_prefix}'"),
        }
    }

    pub fn list(&self, opts: &ListOptions) -> Vec<Purchase> {
        let mut out: Vec<Purchase> = self
            .purchases
            .iter()
            .filter(|p| opts.status.is_none_or(|s| p.status == s))
            .filter(|p| {
                opts.store
                    .as_deref()
                    .is_none_or(|s| p.store.as_deref() == Some(s))
            })
            .cloned()
            .collect();

        let dir = |o: Ordering| match opts.direction {
            Direction::Asc => o,
            Direction::Desc => o.reverse(),
        };

        // Nulls last regardless of direction.
        let nulls_last = |a: Option<chrono::NaiveDate>, b: Option<chrono::NaiveDate>| match (a, b) {
            (Some(x), Some(y)) => dir(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        match opts.order_by {
            OrderBy::ReturnDeadline => {
                out.sort_by(|a, b| nulls_last(a.return_deadline, b.return_deadline))
            }
            OrderBy::WarrantyExpiry => {
                out.sort_by(|a, b| nulls_last(a.warranty_expiry, b.warranty_expiry))
            }
            OrderBy::PurchaseDate => out.sort_by(|a, b| dir(a.purchase_date.cmp(&b.purchase_date))),
            OrderBy::CreatedAt => out.sort_by(|a, b| dir(a.created_at.cmp(&b.created_at))),
        }

        out
    }

    /// Returns the updated purchase, or `None` if the id is unknown.
    pub fn update(
        &mut self,
        id: &str,
        update: &PurchaseUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Purchase>> {
        let Some(idx) = self.purchases.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let updated = self.purchases[idx].apply_update(update, now);
        let out = updated.clone();
        self.commit(move |all| all[idx] = updated)?;
        debug!(id, "updated purchase");
        Ok(Some(out))
    }

    pub fn archive(&mut self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.update(id, &PurchaseUpdate::archive(), now)?.is_some())
    }

    /// Hard delete.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(idx) = self.purchases.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        self.commit(move |all| {
            all.remove(idx);
        })?;
        info!(id, "deleted purchase");
        Ok(true)
    }

    /// Replace the reminder ids recorded for a purchase.
    pub fn set_reminder_ids(&mut self, id: &str, ids: Vec<String>) -> Result<bool> {
        let Some(idx) = self.purchases.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        self.commit(move |all| all[idx].reminder_ids = ids)?;
        Ok(true)
    }

    /// Replace reminder ids for several purchases with a single write.
    /// Unknown ids are ignored; returns how many purchases were updated.
    pub fn set_reminder_ids_many(
        &mut self,
        assignments: Vec<(String, Vec<String>)>,
    ) -> Result<usize> {
        if assignments.is_empty() {
            return Ok(0);
        }
        self.commit(move |all| {
            let mut n = 0;
            for (id, ids) in assignments {
                if let Some(p) = all.iter_mut().find(|p| p.id == id) {
                    p.reminder_ids = ids;
                    n += 1;
                }
            }
            n
        })
    }

    /// Case-insensitive substring match on name or store, newest first.
    pub fn search(&self, query: &str) -> Vec<Purchase> {
        let q = query.trim().to_lowercase();
        let mut out: Vec<Purchase> = self
            .purchases
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&q)
                    || p.store
                        .as_deref()
                        .is_some_and(|s| s.to_lowercase().contains(&q))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Distinct non-empty store names, sorted.
    pub fn unique_stores(&self) -> Vec<String> {
        self.purchases
            .iter()
            .filter_map(|p| p.store.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn counts(&self) -> PurchaseCounts {
        let active = self
            .purchases
            .iter()
            .filter(|p| p.status == PurchaseStatus::Active)
            .count();
        PurchaseCounts {
            total: self.purchases.len(),
            active,
            archived: self.purchases.len() - active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 8, 12, 0, 0).unwrap()
    }

    fn seeded(dir: &TempDir) -> PurchaseStore {
        let mut s = PurchaseStore::open(dir.path().join("purchases.json")).unwrap();
        s.create(
            NewPurchase::new("Laptop", d(2026, 1, 2))
                .with_store("Best Buy")
                .with_return_window(15),
            now(),
        )
        .unwrap();
        s.create(
            NewPurchase::new("Tent", d(2026, 1, 5))
                .with_store("REI")
                .with_return_window(90),
            now() + Duration::minutes(1),
        )
        .unwrap();
        s.create(
            NewPurchase::new("Cable", d(2026, 1, 7)),
            now() + Duration::minutes(2),
        )
        .unwrap();
        s
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let s = PurchaseStore::open(dir.path().join("nope.json")).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let s = seeded(&dir);
        let path = s.path().to_path_buf();
        drop(s);

        let s = PurchaseStore::open(&path).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.all()[0].name, "Laptop");
        assert_eq!(s.all()[0].return_deadline, Some(d(2026, 1, 17)));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_list_orders_deadlines_nulls_last() {
        let dir = TempDir::new().unwrap();
        let s = seeded(&dir);

        let asc = s.list(&ListOptions {
            order_by: OrderBy::ReturnDeadline,
            direction: Direction::Asc,
            ..ListOptions::default()
        });
        let names: Vec<_> = asc.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Laptop", "Tent", "Cable"]);

        let desc = s.list(&ListOptions {
            order_by: OrderBy::ReturnDeadline,
            direction: Direction::Desc,
            ..ListOptions::default()
        });
        let names: Vec<_> = desc.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Tent", "Laptop", "Cable"]);
    }

    #[test]
    fn test_list_default_is_newest_first_and_filters() {
        let dir = TempDir::new().unwrap();
        let mut s = seeded(&dir);
        let names: Vec<_> = s
            .list(&ListOptions::default())
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Cable", "Tent", "Laptop"]);

        let tent_id = s.search("tent")[0].id.clone();
        assert!(s.archive(&tent_id, now()).unwrap());

        let active = s.list(&ListOptions {
            status: Some(PurchaseStatus::Active),
            ..ListOptions::default()
        });
        assert_eq!(active.len(), 2);

        let rei = s.list(&ListOptions {
            store: Some("REI".to_string()),
            ..ListOptions::default()
        });
        assert_eq!(rei.len(), 1);
        assert_eq!(s.counts(), PurchaseCounts { total: 3, active: 2, archived: 1 });
    }

    #[test]
    fn test_update_and_delete() {
        let dir = TempDir::new().unwrap();
        let mut s = seeded(&dir);
        let id = s.search("laptop")[0].id.clone();

        let up = PurchaseUpdate {
            return_window_days: Some(Some(30)),
            ..PurchaseUpdate::default()
        };
        let p = s.update(&id, &up, now()).unwrap().unwrap();
        assert_eq!(p.return_deadline, Some(d(2026, 2, 1)));

        assert!(s.update("missing", &up, now()).unwrap().is_none());
        assert!(s.delete(&id).unwrap());
        assert!(!s.delete(&id).unwrap());
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_set_reminder_ids_many_saves_once() {
        let dir = TempDir::new().unwrap();
        let mut s = seeded(&dir);
        let laptop = s.search("laptop")[0].id.clone();
        let tent = s.search("tent")[0].id.clone();

        let n = s
            .set_reminder_ids_many(vec![
                (laptop.clone(), vec![format!("return-{laptop}-1d")]),
                (tent.clone(), vec![format!("return-{tent}-7d")]),
                ("missing".to_string(), vec!["x".to_string()]),
            ])
            .unwrap();
        assert_eq!(n, 2);

        let reopened = PurchaseStore::open(s.path()).unwrap();
        assert_eq!(
            reopened.get(&laptop).unwrap().reminder_ids,
            vec![format!("return-{laptop}-1d")]
        );
        assert_eq!(reopened.get(&tent).unwrap().reminder_ids.len(), 1);
        assert_eq!(s.set_reminder_ids_many(Vec::new()).unwrap(), 0);
    }

    #[test]
    fn test_search_and_stores() {
        let dir = TempDir::new().unwrap();
        let s = seeded(&dir);
        assert_eq!(s.search("best").len(), 1);
        assert_eq!(s.search("zzz").len(), 0);
        assert_eq!(s.unique_stores(), vec!["Best Buy".to_string(), "REI".to_string()]);
    }

    #[test]
    fn test_resolve_prefix() {
        let dir = TempDir::new().unwrap();
        let s = seeded(&dir);
        let id = s.all()[1].id.clone();
        assert_eq!(s.resolve(&id).unwrap().name, "Tent");
        assert_eq!(s.resolve(&id[..12]).unwrap().name, "Tent");
        assert!(s.resolve("not-an-id").is_err());
        assert!(s.resolve("").is_err());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("purchases.json");
        fs::write(&path, r#"{"version": 99, "purchases": []}"#).unwrap();
        assert!(PurchaseStore::open(&path).is_err());
    }
}
