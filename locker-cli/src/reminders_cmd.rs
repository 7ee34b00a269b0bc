use anyhow::{Context, Result};
use clap::Subcommand;
use locker_core::{project_purchase_reminders, ReminderIntent};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use tracing::{debug, info};

use crate::state::reminder_queue_path;
use crate::App;

#[derive(Subcommand, Debug)]
pub enum RemindersCommand {
    /// Project reminder intents for every active purchase and rewrite the local queue
    Plan {
        /// Max intents to print
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Print only; do not touch the queue or the store
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// List queued reminder intents, soonest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub fn run(cmd: RemindersCommand, app: &App) -> Result<()> {
    match cmd {
        RemindersCommand::Plan { limit, dry_run } => plan(app, limit, dry_run),
        RemindersCommand::List { limit } => list(limit),
    }
}

fn plan(app: &App, limit: usize, dry_run: bool) -> Result<()> {
    let mut store = app.open_store()?;
    let policy = app.cfg.reminder_policy();

    let mut all: Vec<ReminderIntent> = Vec::new();
    let mut assignments: Vec<(String, Vec<String>)> = Vec::new();

    for p in store.all() {
        let intents = project_purchase_reminders(p, app.now, app.tz, &policy);
        let ids: Vec<String> = intents.iter().map(|i| i.intent_id.clone()).collect();
        if ids != p.reminder_ids {
            assignments.push((p.id.clone(), ids));
        }
        all.extend(intents);
    }
    all.sort_by(|a, b| a.send_at_utc.cmp(&b.send_at_utc));

    for (i, r) in all.iter().take(limit).enumerate() {
        println!(
            "{}. {} | {} at {}",
            i + 1,
            r.title,
            r.body,
            r.send_at_utc.with_timezone(&app.tz).format("%Y-%m-%d %H:%M %Z")
        );
    }
    if all.len() > limit {
        println!("... and {} more", all.len() - limit);
    }

    if dry_run {
        println!("[DRY RUN] {} intents, queue not written", all.len());
        return Ok(());
    }

    let updated = store.set_reminder_ids_many(assignments)?;
    debug!(updated, "recorded reminder ids");

    let q = reminder_queue_path()?;
    if let Some(parent) = q.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let f = fs::File::create(&q).with_context(|| format!("create {}", q.display()))?;
    let mut w = BufWriter::new(f);
    for r in &all {
        writeln!(w, "{}", serde_json::to_string(r)?)?;
    }
    w.flush()?;

    info!(count = all.len(), path = %q.display(), "wrote reminder queue");
    println!("Queued {} reminder intents in {}", all.len(), q.display());
    Ok(())
}

fn list(limit: usize) -> Result<()> {
    let q = reminder_queue_path()?;
    if !q.exists() {
        println!("No reminder queue at {}", q.display());
        return Ok(());
    }

    let f = fs::File::open(&q).with_context(|| format!("open {}", q.display()))?;
    let mut rows: Vec<ReminderIntent> = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ReminderIntent>(&line) {
            Ok(v) => rows.push(v),
            Err(e) => debug!(error = %e, "skipping unreadable queue line"),
        }
    }
    rows.sort_by(|a, b| a.send_at_utc.cmp(&b.send_at_utc));

    for (i, r) in rows.iter().take(limit).enumerate() {
        println!(
            "{}. [{}] {} -> {}",
            i + 1,
            r.intent_id,
            r.body,
            r.send_at_utc.to_rfc3339()
        );
    }
    Ok(())
}
