// Backup model
// Backups are plain copies of kanban_data.json in data/backups/

use serde::Serialize;

/// How a backup came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BackupKind {
    /// backup_<timestamp>.json, manual or automatic, subject to retention
    Scheduled,
    /// pre_restore_<timestamp>.json, taken before a restore overwrites the document
    PreRestore,
}

impl BackupKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Scheduled => "backup_",
            Self::PreRestore => "pre_restore_",
        }
    }

    pub fn fromFileName(name: &str) -> Option<Self> {
        if !name.ends_with(".json") {
            return None;
        }
        [Self::Scheduled, Self::PreRestore]
            .into_iter()
            .find(|kind| name.starts_with(kind.prefix()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: String,
    /// Modification time in milliseconds since the epoch
    pub date: i64,
    pub size: u64,
    pub kind: BackupKind,
}
