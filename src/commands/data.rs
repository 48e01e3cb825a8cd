// Data commands - load and save the whole task document

use std::fs;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::TaskDocument;
use crate::storage::{writeAtomic, Storage};
use super::backup::checkAutoBackupLocked;
use super::common::nowIso;

#[derive(Debug, serde::Serialize)]
pub struct LoadedData {
    #[serde(flatten)]
    pub document: TaskDocument,
    /// Set when the file existed but could not be used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loadWarning: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct SavedData {
    pub lastModified: String,
    /// Backup file created by this save, if one was due
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

/// Load the document. A missing file is a first run; an unreadable one
/// falls back to an empty document with a warning.
pub fn loadData(storage: &Storage) -> LoadedData {
    let path = storage.dataFilePath();
    if !path.exists() {
        return LoadedData {
            document: TaskDocument::default(),
            loadWarning: None,
        };
    }

    let loaded = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read data file: {}", e))
        .and_then(|text| TaskDocument::fromJson(&text).map_err(|e| format!("Failed to parse data file: {}", e)));

    match loaded {
        Ok(document) => LoadedData {
            document,
            loadWarning: None,
        },
        Err(message) => {
            warn!(path = %path.display(), "[loadData] {}; returning empty document", message);
            LoadedData {
                document: TaskDocument::default(),
                loadWarning: Some(message),
            }
        }
    }
}

/// Stamp and write the full document, then run the auto-backup check
pub fn saveData(storage: &Storage, mut document: TaskDocument) -> Result<SavedData> {
    let _guard = storage.documentLock.lock();

    let lastModified = nowIso();
    document.lastModified = Some(lastModified.clone());

    let json = serde_json::to_string_pretty(&document)?;
    writeAtomic(&storage.dataFilePath(), json.as_bytes()).map_err(|e| {
        warn!("[saveData] ERROR writing document: {}", e);
        e
    })?;
    info!("[saveData] Saved {} tasks", document.tasks.len());

    let autoBackup = storage.settings.read().autoBackup;
    let backup = if autoBackup {
        checkAutoBackupLocked(storage)
    } else {
        None
    };

    Ok(SavedData { lastModified, backup })
}
