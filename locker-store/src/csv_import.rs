//! Bulk purchase import from CSV.
//!
//! Expected header (column order does not matter, names do):
//! name,store,price,currency,purchase_date,return_days,warranty_months,serial,notes
//!
//! Only `name` and `purchase_date` are required. Blank `return_days` or
//! `warranty_months` fall back to the store's known policy.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use locker_core::{policy_for, NewPurchase};
use regex::Regex;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

const COLUMNS: [&str; 9] = [
    "name",
    "store",
    "price",
    "currency",
    "purchase_date",
    "return_days",
    "warranty_months",
    "serial",
    "notes",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line the row starts on; the header is line 1.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CsvImport {
    pub purchases: Vec<NewPurchase>,
    pub skipped: Vec<SkippedRow>,
}

/// Column positions resolved from the header row.
struct Columns([Option<usize>; 9]);

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Result<Self> {
        let mut idx = [None; 9];
        for (i, col) in COLUMNS.iter().enumerate() {
            idx[i] = header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(col));
        }
        if idx[0].is_none() || idx[4].is_none() {
            bail!("CSV header must include 'name' and 'purchase_date'");
        }
        Ok(Self(idx))
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, col: &str) -> Option<&'r str> {
        let i = COLUMNS.iter().position(|c| *c == col)?;
        self.0[i]
            .and_then(|pos| record.get(pos))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// ISO first, then US-style month/day/year.
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}

/// `$1,299.99` -> 1299.99
fn parse_price(price_re: &Regex, s: &str) -> Option<f64> {
    let caps = price_re.captures(s)?;
    caps.get(1)?.as_str().replace(',', "").parse().ok()
}

fn parse_count(s: Option<&str>, col: &str) -> Result<Option<u32>, String> {
    match s {
        None => Ok(None),
        Some(v) => v
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("invalid {col} '{v}'")),
    }
}

pub fn parse_purchases_csv<R: Read>(reader: R) -> Result<CsvImport> {
    let price_re = Regex::new(r"^\$?\s*([0-9][0-9,]*(?:\.[0-9]+)?)$")?;

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let cols = Columns::from_header(rdr.headers().context("read CSV header")?)?;
    let mut out = CsvImport::default();

    for (i, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("read CSV record {}", i + 1))?;
        let line = record
            .position()
            .map_or(i + 2, |p| usize::try_from(p.line()).unwrap_or(usize::MAX));
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let mut skip = |reason: String| {
            warn!(line, %reason, "skipping CSV row");
            out.skipped.push(SkippedRow { line, reason });
        };

        let Some(name) = cols.get(&record, "name") else {
            skip("missing name".to_string());
            continue;
        };
        let Some(date_str) = cols.get(&record, "purchase_date") else {
            skip("missing purchase_date".to_string());
            continue;
        };
        let Some(purchase_date) = parse_date(date_str) else {
            skip(format!("unparseable purchase_date '{date_str}'"));
            continue;
        };
        let return_days = match parse_count(cols.get(&record, "return_days"), "return_days") {
            Ok(v) => v,
            Err(reason) => {
                skip(reason);
                continue;
            }
        };
        let warranty_months =
            match parse_count(cols.get(&record, "warranty_months"), "warranty_months") {
                Ok(v) => v,
                Err(reason) => {
                    skip(reason);
                    continue;
                }
            };

        let store = cols.get(&record, "store");
        let policy = policy_for(store);

        let mut input = NewPurchase::new(name, purchase_date)
            .with_return_window(return_days.unwrap_or(policy.return_days))
            .with_warranty_months(warranty_months.unwrap_or(policy.warranty_months));
        input.store = store.map(str::to_string);
        input.price = cols
            .get(&record, "price")
            .and_then(|p| parse_price(&price_re, p));
        input.currency = cols.get(&record, "currency").map(str::to_uppercase);
        input.serial_number = cols.get(&record, "serial").map(str::to_string);
        input.notes = cols.get(&record, "notes").map(str::to_string);

        out.purchases.push(input);
    }

    Ok(out)
}

pub fn parse_purchases_csv_file(path: impl AsRef<Path>) -> Result<CsvImport> {
    let path = path.as_ref();
    let f = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_purchases_csv(f)
}
