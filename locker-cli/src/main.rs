use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand, ValueEnum};
use locker_core::urgency::{classify_with, count_urgent_with, group_by_urgency_with};
use locker_core::{
    action_items, deadline_status, parse_iso_date, policy_for, store_defaults, Clock, FixedClock,
    NewPurchase, PurchaseStatus, PurchaseUpdate, SystemClock, STORE_DEFAULTS,
};
use locker_store::{
    export_backup, import_backup, parse_purchases_csv_file, Direction, ListOptions, OrderBy,
    PurchaseStore,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod reminders_cmd;
mod render;
mod state;

use config::{init_config, load_config, Config};
use render::{purchase_detail, purchase_line, short_id, tier_heading};

#[derive(Parser, Debug)]
#[command(name = "locker", version, about = "Track return windows and warranties")]
struct Cli {
    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Config file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    #[command(flatten)]
    Purchases(PurchaseCommand),
}

#[derive(Subcommand, Debug)]
enum PurchaseCommand {
    /// Record a purchase; windows default to the store's known policy
    Add {
        name: String,

        #[arg(long)]
        store: Option<String>,

        #[arg(long)]
        price: Option<f64>,

        #[arg(long)]
        currency: Option<String>,

        /// Purchase date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,

        /// Return window in days (0 = none)
        #[arg(long)]
        return_days: Option<u32>,

        /// Warranty length in months (0 = none)
        #[arg(long)]
        warranty_months: Option<u32>,

        #[arg(long)]
        serial: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List purchases grouped by urgency (or flat with --order-by)
    List {
        /// Include archived purchases
        #[arg(long, default_value_t = false)]
        all: bool,

        #[arg(long)]
        store: Option<String>,

        /// Flat list in this order instead of urgency groups
        #[arg(long, value_enum)]
        order_by: Option<SortKey>,

        #[arg(long, default_value_t = false)]
        asc: bool,
    },

    /// Show one purchase (id or unique id prefix)
    Show { id: String },

    /// Change fields on a purchase; deadlines are recomputed when dates or windows change
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        store: Option<String>,

        #[arg(long)]
        price: Option<f64>,

        #[arg(long)]
        currency: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        return_days: Option<u32>,

        #[arg(long)]
        warranty_months: Option<u32>,

        #[arg(long)]
        serial: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Set status back to active
        #[arg(long, default_value_t = false)]
        unarchive: bool,
    },

    /// Archive a purchase (kept for reference, never urgent)
    Archive { id: String },

    /// Permanently delete a purchase
    Delete { id: String },

    /// Case-insensitive search over name and store
    Search { query: String },

    /// What needs doing today
    Today,

    /// Deadline label for a date, e.g. "2 days left"
    Status { date: String },

    /// Reminder projection and local queue
    Reminders {
        #[command(subcommand)]
        command: reminders_cmd::RemindersCommand,
    },

    /// Write a JSON backup of every purchase
    Export { path: PathBuf },

    /// Merge a JSON backup into the store
    Import { path: PathBuf },

    /// Bulk-add purchases from CSV
    ImportCsv {
        path: PathBuf,

        /// Parse and report only
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Stores seen so far, with their return/warranty policy
    Stores {
        /// Also print the built-in retailer policy table
        #[arg(long, default_value_t = false)]
        known: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.locker/config.toml with defaults
    Init,
    /// Print the effective config
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortKey {
    Return,
    Warranty,
    Purchased,
    Created,
}

impl From<SortKey> for OrderBy {
    fn from(k: SortKey) -> Self {
        match k {
            SortKey::Return => OrderBy::ReturnDeadline,
            SortKey::Warranty => OrderBy::WarrantyExpiry,
            SortKey::Purchased => OrderBy::PurchaseDate,
            SortKey::Created => OrderBy::CreatedAt,
        }
    }
}

/// Everything a command needs, with the clock read exactly once.
pub struct App {
    pub cfg: Config,
    pub tz: Tz,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl App {
    fn new(cfg: Config, today_override: Option<&str>) -> Result<Self> {
        let tz = cfg.timezone()?;
        let clock = match today_override {
            Some(s) => FixedClock::at_date(parse_iso_date(s)?, tz),
            None => FixedClock::new(SystemClock::new(tz).now_utc(), tz),
        };
        debug!(today = %clock.today(), %tz, "clock read");
        Ok(Self {
            cfg,
            tz,
            now: clock.now_utc(),
            today: clock.today(),
        })
    }

    pub fn open_store(&self) -> Result<PurchaseStore> {
        let p = state::data_path(&self.cfg.storage.data_file)?;
        PurchaseStore::open(&p).with_context(|| format!("open store {}", p.display()))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Config { command } => run_config(command),
        Command::Purchases(command) => {
            let app = App::new(load_config()?, cli.today.as_deref())?;
            run(command, &app)
        }
    }
}

fn run_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init => init_config(),
        ConfigCommand::Show => {
            let cfg = load_config()?;
            println!("# {}", config::config_path()?.display());
            print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            Ok(())
        }
    }
}

fn run(command: PurchaseCommand, app: &App) -> Result<()> {
    match command {
        PurchaseCommand::Add {
            name,
            store,
            price,
            currency,
            date,
            return_days,
            warranty_months,
            serial,
            notes,
        } => {
            if name.trim().is_empty() {
                bail!("name must not be empty");
            }
            let purchase_date = match date {
                Some(s) => parse_iso_date(&s)?,
                None => app.today,
            };
            let policy = policy_for(store.as_deref());
            let input = NewPurchase {
                name: name.trim().to_string(),
                store,
                price,
                currency: currency.map(|c| c.to_uppercase()),
                purchase_date,
                return_window_days: Some(return_days.unwrap_or(policy.return_days)),
                warranty_months: Some(warranty_months.unwrap_or(policy.warranty_months)),
                serial_number: serial,
                notes,
            };

            let mut s = app.open_store()?;
            let p = s.create(input, app.now)?;
            println!("Added {}", purchase_line(&p, app.today));
        }

        PurchaseCommand::List {
            all,
            store,
            order_by,
            asc,
        } => {
            let s = app.open_store()?;
            let opts = ListOptions {
                status: if all { None } else { Some(PurchaseStatus::Active) },
                store,
                order_by: order_by.map(OrderBy::from).unwrap_or_default(),
                direction: if asc { Direction::Asc } else { Direction::Desc },
            };
            let rows = s.list(&opts);
            if rows.is_empty() {
                println!("No purchases.");
                return Ok(());
            }

            if order_by.is_some() {
                for p in &rows {
                    println!("{}", purchase_line(p, app.today));
                }
                return Ok(());
            }

            let groups = group_by_urgency_with(&rows, app.today, &app.cfg.thresholds());
            for (tier, items) in groups.iter() {
                if items.is_empty() {
                    continue;
                }
                println!("## {} ({})", tier_heading(tier), items.len());
                for p in items {
                    println!("  {}", purchase_line(p, app.today));
                }
                println!();
            }
        }

        PurchaseCommand::Show { id } => {
            let s = app.open_store()?;
            let p = s.resolve(&id)?;
            let c = classify_with(p, app.today, &app.cfg.thresholds());
            println!("{}", purchase_detail(p, app.today, &c));
        }

        PurchaseCommand::Update {
            id,
            name,
            store,
            price,
            currency,
            date,
            return_days,
            warranty_months,
            serial,
            notes,
            unarchive,
        } => {
            let mut s = app.open_store()?;
            let id = s.resolve(&id)?.id.clone();
            let update = PurchaseUpdate {
                name,
                store: store.map(Some),
                price: price.map(Some),
                currency: currency.map(|c| Some(c.to_uppercase())),
                purchase_date: date.as_deref().map(parse_iso_date).transpose()?,
                return_window_days: return_days.map(Some),
                warranty_months: warranty_months.map(Some),
                serial_number: serial.map(Some),
                notes: notes.map(Some),
                status: unarchive.then_some(PurchaseStatus::Active),
            };
            if update.is_empty() {
                bail!("nothing to update (pass at least one field flag)");
            }
            match s.update(&id, &update, app.now)? {
                Some(p) => println!("Updated {}", purchase_line(&p, app.today)),
                None => bail!("no purchase with id '{id}'"),
            }
        }

        PurchaseCommand::Archive { id } => {
            let mut s = app.open_store()?;
            let id = s.resolve(&id)?.id.clone();
            s.archive(&id, app.now)?;
            println!("Archived {}", short_id(&id));
        }

        PurchaseCommand::Delete { id } => {
            let mut s = app.open_store()?;
            let id = s.resolve(&id)?.id.clone();
            s.delete(&id)?;
            println!("Deleted {}", short_id(&id));
        }

        PurchaseCommand::Search { query } => {
            let s = app.open_store()?;
            let hits = s.search(&query);
            if hits.is_empty() {
                println!("No matches for '{query}'.");
            }
            for p in &hits {
                println!("{}", purchase_line(p, app.today));
            }
        }

        PurchaseCommand::Today => {
            let s = app.open_store()?;
            let all = s.all();
            let items = action_items(all, app.today);
            let urgent = count_urgent_with(all, app.today, &app.cfg.thresholds());

            println!("# {}\n", locker_core::dates::format_display_date(app.today));
            if items.is_empty() {
                println!("Nothing needs doing today.");
            }
            let sections = [
                ("Overdue returns", &items.overdue),
                ("Returns due this week", &items.return_due_soon),
                ("Warranties expiring this month", &items.warranty_expiring_soon),
            ];
            for (title, bucket) in sections {
                if bucket.is_empty() {
                    continue;
                }
                println!("## {title}");
                for p in bucket {
                    println!("  {}", purchase_line(p, app.today));
                }
                println!();
            }
            println!("Urgent: {urgent}");
        }

        PurchaseCommand::Status { date } => {
            let deadline = parse_iso_date(&date)?;
            let st = deadline_status(deadline, app.today);
            println!("{} [{}]", st.text, st.kind);
        }

        PurchaseCommand::Reminders { command } => reminders_cmd::run(command, app)?,

        PurchaseCommand::Export { path } => {
            let s = app.open_store()?;
            let n = export_backup(&s, &path, app.now)?;
            println!("Exported {n} purchases to {}", path.display());
        }

        PurchaseCommand::Import { path } => {
            let mut s = app.open_store()?;
            let report = import_backup(&mut s, &path, app.now)?;
            println!("Imported {} purchases", report.imported);
            for f in &report.failed {
                println!("  entry {}: {}", f.index, f.reason);
            }
        }

        PurchaseCommand::ImportCsv { path, dry_run } => {
            let parsed = parse_purchases_csv_file(&path)?;
            for skipped in &parsed.skipped {
                println!("  line {}: {}", skipped.line, skipped.reason);
            }
            if dry_run {
                println!(
                    "[DRY RUN] {} rows parsed, {} skipped",
                    parsed.purchases.len(),
                    parsed.skipped.len()
                );
                return Ok(());
            }
            let mut s = app.open_store()?;
            let created = s.create_many(parsed.purchases, app.now)?;
            println!(
                "Imported {} purchases ({} rows skipped)",
                created.len(),
                parsed.skipped.len()
            );
        }

        PurchaseCommand::Stores { known } => {
            let s = app.open_store()?;
            for name in s.unique_stores() {
                match store_defaults(&name) {
                    Some(p) => println!(
                        "{name}: {} day returns, {} month warranty",
                        p.return_days, p.warranty_months
                    ),
                    None => println!("{name}: no known policy"),
                }
            }
            if known {
                println!("\nKnown policies:");
                for (name, p) in STORE_DEFAULTS {
                    println!("  {name}: {}d / {}mo", p.return_days, p.warranty_months);
                }
            }
        }
    }

    Ok(())
}
