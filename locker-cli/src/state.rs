use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$LOCKER_HOME` if set, otherwise `~/.locker`.
pub fn locker_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("LOCKER_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".locker"))
}

pub fn ensure_locker_home() -> Result<PathBuf> {
    let dir = locker_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn data_path(file_name: &str) -> Result<PathBuf> {
    Ok(ensure_locker_home()?.join(file_name))
}

pub fn reminder_queue_path() -> Result<PathBuf> {
    Ok(ensure_locker_home()?.join("reminders").join("intents.jsonl"))
}
