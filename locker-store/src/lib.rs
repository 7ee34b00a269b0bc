//! locker-store: where purchases live on disk.

pub mod backup;
pub mod csv_import;
pub mod store;

pub use backup::{export_backup, import_backup, BackupData, ImportReport, BACKUP_VERSION};
pub use csv_import::{parse_purchases_csv, parse_purchases_csv_file, CsvImport, SkippedRow};
pub use store::{Direction, ListOptions, OrderBy, PurchaseCounts, PurchaseStore};
