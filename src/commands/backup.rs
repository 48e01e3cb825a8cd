// Backup commands - snapshots of the task document with age and count retention

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone};
use std::fs;
use std::path::Path;
use std::time::{Duration as StdDuration, SystemTime};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::{BackupInfo, BackupKind, Settings};
use crate::storage::{validateName, writeAtomic, Storage};
use super::attachment::uniqueFileName;
use super::common::{fileTimestamp, toMillis};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, serde::Serialize)]
pub struct BackupCreated {
    pub file: String,
    pub evicted: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct RestoreResult {
    /// Snapshot of the document as it was before the restore
    pub preRestore: Option<String>,
}

/// Parse a stored "last backup" time. Accepts RFC 3339 and naive local ISO timestamps.
fn parseTimestamp(text: &str) -> Option<DateTime<Local>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

/// True when no backup was ever recorded or the last one is older than backupInterval hours
pub fn shouldAutoBackup(settings: &Settings, now: DateTime<Local>) -> bool {
    let Some(last) = settings.lastBackup.as_deref() else {
        return true;
    };
    match parseTimestamp(last) {
        Some(lastAt) => now.signed_duration_since(lastAt) > Duration::hours(settings.backupInterval as i64),
        None => {
            warn!("[shouldAutoBackup] Unreadable lastBackup {:?}, treating as due", last);
            true
        }
    }
}

/// Scan a backups directory, newest first
fn scanBackups(dir: &Path) -> Vec<BackupInfo> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            debug!("[scanBackups] Cannot read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut backups: Vec<BackupInfo> = entries
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let kind = BackupKind::fromFileName(&name)?;
            let meta = entry.metadata().ok().filter(|m| m.is_file())?;
            Some(BackupInfo {
                date: meta.modified().map(toMillis).unwrap_or(0),
                size: meta.len(),
                path: entry.path().to_string_lossy().to_string(),
                name,
                kind,
            })
        })
        .collect();

    backups.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.name.cmp(&a.name)));
    backups
}

fn removeBackup(backup: &BackupInfo) -> bool {
    match fs::remove_file(&backup.path) {
        Ok(()) => true,
        Err(e) => {
            warn!("[enforceRetention] Could not delete {}: {}", backup.name, e);
            false
        }
    }
}

/// Apply retention to scheduled backups: first drop everything older than
/// retentionDays, then keep only the newest maxBackups of what is left.
/// Returns the names of deleted backups.
pub fn enforceRetention(dir: &Path, retentionDays: u32, maxBackups: u32, now: SystemTime) -> Vec<String> {
    let backups: Vec<BackupInfo> = scanBackups(dir)
        .into_iter()
        .filter(|b| b.kind == BackupKind::Scheduled)
        .collect();

    let cutoff = now
        .checked_sub(StdDuration::from_secs(retentionDays as u64 * SECONDS_PER_DAY))
        .map(toMillis)
        .unwrap_or(0);

    let mut evicted = Vec::new();
    let mut remaining = Vec::new();

    // 1. Age
    for backup in backups {
        if backup.date < cutoff && removeBackup(&backup) {
            evicted.push(backup.name);
        } else {
            remaining.push(backup);
        }
    }

    // 2. Count (remaining is still newest first)
    for backup in remaining.iter().skip(maxBackups as usize) {
        if removeBackup(backup) {
            evicted.push(backup.name.clone());
        }
    }

    if !evicted.is_empty() {
        info!("[enforceRetention] Deleted {} old backups", evicted.len());
    }
    evicted
}

/// Name for a new backup file. A name already taken in the same second gets
/// a "_<n>" suffix, so an existing backup is never overwritten.
/// Caller must hold the document lock.
fn newBackupName(backupsDir: &Path, kind: BackupKind, at: DateTime<Local>) -> String {
    uniqueFileName(backupsDir, &format!("{}{}.json", kind.prefix(), fileTimestamp(at)))
}

/// Create a backup; caller must hold the document lock
pub(crate) fn createBackupLocked(storage: &Storage) -> Result<BackupCreated> {
    let dataFile = storage.dataFilePath();
    if !dataFile.is_file() {
        return Err(AppError::notFound("No data file to backup"));
    }

    let now = Local::now();
    let backupsDir = storage.backupsDir();
    let file = newBackupName(&backupsDir, BackupKind::Scheduled, now);

    let content = fs::read(&dataFile)?;
    writeAtomic(&backupsDir.join(&file), &content)?;
    info!("[createBackup] Created {}", file);

    let recorded = storage.updateSettings(|settings| {
        settings.lastBackup = Some(now.to_rfc3339());
        Ok(())
    });
    if let Err(e) = recorded {
        warn!("[createBackup] Could not record lastBackup: {}", e);
    }

    let settings = storage.currentSettings();
    let evicted = enforceRetention(&backupsDir, settings.backupRetention, settings.maxBackups, SystemTime::now());

    Ok(BackupCreated { file, evicted })
}

pub fn createBackup(storage: &Storage) -> Result<BackupCreated> {
    let _guard = storage.documentLock.lock();
    createBackupLocked(storage)
}

/// Backup after a save when the interval has elapsed; caller must hold the document lock
pub(crate) fn checkAutoBackupLocked(storage: &Storage) -> Option<String> {
    if !shouldAutoBackup(&storage.currentSettings(), Local::now()) {
        return None;
    }
    match createBackupLocked(storage) {
        Ok(created) => Some(created.file),
        Err(e) => {
            warn!("[checkAutoBackup] Auto backup failed: {}", e);
            None
        }
    }
}

/// All backups, newest first. Never fails.
pub fn listBackups(storage: &Storage) -> Vec<BackupInfo> {
    scanBackups(&storage.backupsDir())
}

pub fn restoreBackup(storage: &Storage, name: &str) -> Result<RestoreResult> {
    info!("[restoreBackup] Called with: {}", name);
    let backupsDir = storage.backupsDir();
    let backupPath = backupsDir.join(validateName("backup name", name)?);

    let _guard = storage.documentLock.lock();
    if !backupPath.is_file() {
        return Err(AppError::notFound("Backup file not found"));
    }
    let dataFile = storage.dataFilePath();

    let preRestore = if dataFile.is_file() {
        let snapshot = newBackupName(&backupsDir, BackupKind::PreRestore, Local::now());
        writeAtomic(&backupsDir.join(&snapshot), &fs::read(&dataFile)?)?;
        info!("[restoreBackup] Saved current document as {}", snapshot);
        Some(snapshot)
    } else {
        None
    };

    writeAtomic(&dataFile, &fs::read(&backupPath)?)?;
    info!("[restoreBackup] SUCCESS");
    Ok(RestoreResult { preRestore })
}

pub fn deleteBackup(storage: &Storage, name: &str) -> Result<()> {
    let path = storage.backupsDir().join(validateName("backup name", name)?);

    let _guard = storage.documentLock.lock();
    if !path.is_file() {
        return Err(AppError::notFound("Backup not found"));
    }
    fs::remove_file(&path)?;
    info!("[deleteBackup] Deleted {}", name);
    Ok(())
}
