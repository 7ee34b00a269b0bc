use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use locker_core::{ReminderPolicy, TierThresholds, UrgencyThresholds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_locker_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralSection,
    pub urgency: UrgencySection,
    pub reminders: RemindersSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSection {
    /// IANA name; decides what "today" is.
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencySection {
    pub return_urgent_days: i64,
    pub return_upcoming_days: i64,
    pub warranty_urgent_days: i64,
    pub warranty_upcoming_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersSection {
    pub return_lead_days: Vec<u32>,
    pub warranty_lead_days: Vec<u32>,
    pub send_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub data_file: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
        }
    }
}

impl Default for UrgencySection {
    fn default() -> Self {
        let t = UrgencyThresholds::default();
        Self {
            return_urgent_days: t.return_deadline.urgent_days,
            return_upcoming_days: t.return_deadline.upcoming_days,
            warranty_urgent_days: t.warranty.urgent_days,
            warranty_upcoming_days: t.warranty.upcoming_days,
        }
    }
}

impl Default for RemindersSection {
    fn default() -> Self {
        let p = ReminderPolicy::default();
        Self {
            return_lead_days: p.return_lead_days,
            warranty_lead_days: p.warranty_lead_days,
            send_hour: p.send_hour,
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_file: "purchases.json".to_string(),
        }
    }
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        match self.general.timezone.parse::<Tz>() {
            Ok(tz) => Ok(tz),
            Err(_) => bail!("unknown timezone '{}' in config", self.general.timezone),
        }
    }

    pub fn thresholds(&self) -> UrgencyThresholds {
        UrgencyThresholds {
            return_deadline: TierThresholds {
                urgent_days: self.urgency.return_urgent_days,
                upcoming_days: self.urgency.return_upcoming_days,
            },
            warranty: TierThresholds {
                urgent_days: self.urgency.warranty_urgent_days,
                upcoming_days: self.urgency.warranty_upcoming_days,
            },
        }
    }

    pub fn reminder_policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            return_lead_days: self.reminders.return_lead_days.clone(),
            warranty_lead_days: self.reminders.warranty_lead_days.clone(),
            send_hour: self.reminders.send_hour.min(23),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_locker_home()?.join("config.toml"))
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
