//! Local history backups for file exports.
//!
//! Before an export overwrites `permissions.jsonl`, the previous file is
//! copied to `permissions.<YYYYMMDD_HHMMSS>.jsonl` in the history directory.
//! Backups identical to the newest one are skipped, and old backups are
//! rotated by count and age.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

const BACKUP_PREFIX: &str = "permissions.";
const BACKUP_EXT: &str = "jsonl";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Configuration for history backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub max_count: usize,
    pub max_age_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: 100,
            max_age_days: 30,
        }
    }
}

/// Backup entry metadata.
#[derive(Debug, Clone)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
}

/// Copy `export_path` into `history_dir` before it is overwritten.
///
/// Returns the new backup path, or `None` if nothing was written.
///
/// # Errors
///
/// Returns an error if the backup cannot be created or rotation fails.
pub fn backup_before_export(
    export_path: &Path,
    history_dir: &Path,
    config: &HistoryConfig,
) -> Result<Option<PathBuf>> {
    if !config.enabled || !export_path.exists() {
        return Ok(None);
    }

    fs::create_dir_all(history_dir)?;

    if let Some(latest) = list_backups(history_dir)?.into_iter().next() {
        if file_digest(export_path)? == file_digest(&latest.path)? {
            tracing::debug!(
                "Skipping backup: identical to latest {}",
                latest.path.display()
            );
            return Ok(None);
        }
    }

    let timestamp = Utc::now().format(TIMESTAMP_FORMAT);
    let backup_path = history_dir.join(format!("{BACKUP_PREFIX}{timestamp}.{BACKUP_EXT}"));
    fs::copy(export_path, &backup_path)?;
    tracing::debug!("Created backup: {}", backup_path.display());

    rotate_history(history_dir, config)?;
    Ok(Some(backup_path))
}

/// Delete backups beyond `max_count` or older than `max_age_days`.
fn rotate_history(history_dir: &Path, config: &HistoryConfig) -> Result<()> {
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(config.max_age_days));
    let mut deleted = 0;

    for (idx, entry) in list_backups(history_dir)?.iter().enumerate() {
        if idx >= config.max_count || entry.timestamp < cutoff {
            fs::remove_file(&entry.path)?;
            deleted += 1;
        }
    }

    if deleted > 0 {
        tracing::debug!("Pruned {} old backup(s)", deleted);
    }
    Ok(())
}

fn parse_backup_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_EXT)?
        .strip_suffix('.')?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// List backups sorted newest first.
///
/// Files whose names do not carry a valid timestamp are ignored.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_backups(history_dir: &Path) -> Result<Vec<BackupEntry>> {
    if !history_dir.exists() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in fs::read_dir(history_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(timestamp) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_backup_name)
        else {
            continue;
        };
        let size = fs::metadata(&path)?.len();
        backups.push(BackupEntry {
            path,
            timestamp,
            size,
        });
    }

    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(backups)
}

fn file_digest(path: &Path) -> Result<[u8; 32]> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().into())
}
