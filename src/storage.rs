// Filesystem-based storage layer for the board
// One context object owns the data root, the settings cache and the write locks

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::Settings;

pub const DATA_FILE_NAME: &str = "kanban_data.json";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// ============================================
// PATH HELPERS
// ============================================

/// Default application root (~/.local/share/kanban-board on Linux)
pub fn defaultAppRoot() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kanban-board")
}

/// Reject anything that is not a single plain file or directory name
pub fn validateName<'a>(what: &str, name: &'a str) -> Result<&'a str> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || name.contains(['/', '\\', '\0']) {
        return Err(AppError::malformed(format!("Invalid {}: {:?}", what, name)));
    }
    Ok(name)
}

/// Write bytes next to the target, fsync, then rename over it.
/// The previous file stays intact if anything fails before the rename.
pub fn writeAtomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmpName = format!(
        ".{}.{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("data"),
        uuid::Uuid::new_v4().simple()
    );
    let tmpPath = path.with_file_name(tmpName);

    let result = (|| -> Result<()> {
        let mut file = fs::File::create(&tmpPath)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmpPath, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmpPath);
    }
    result
}

// ============================================
// STORAGE STATE
// ============================================

/// Explicit context passed to every command
pub struct Storage {
    pub rootDir: PathBuf,
    pub settings: RwLock<Settings>,
    /// Why the settings file could not be used as-is, if it couldn't
    pub settingsWarning: Option<String>,
    /// Held across load-modify-save of the document and backup creation/restore
    pub documentLock: Mutex<()>,
    /// Held while attachment names are resolved and files written
    pub attachmentLock: Mutex<()>,
}

impl Storage {
    pub fn new(rootDir: impl Into<PathBuf>) -> Self {
        let rootDir = rootDir.into();
        let settingsPath = rootDir.join("data").join(SETTINGS_FILE_NAME);
        let (settings, settingsWarning) = loadSettings(&settingsPath);

        Self {
            rootDir,
            settings: RwLock::new(settings),
            settingsWarning,
            documentLock: Mutex::new(()),
            attachmentLock: Mutex::new(()),
        }
    }

    pub fn dataDir(&self) -> PathBuf {
        self.rootDir.join("data")
    }

    pub fn dataFilePath(&self) -> PathBuf {
        self.dataDir().join(DATA_FILE_NAME)
    }

    pub fn settingsPath(&self) -> PathBuf {
        self.dataDir().join(SETTINGS_FILE_NAME)
    }

    pub fn backupsDir(&self) -> PathBuf {
        self.dataDir().join("backups")
    }

    pub fn attachmentsDir(&self) -> PathBuf {
        self.dataDir().join("attachments")
    }

    /// Attachment directory of one task (not created)
    pub fn taskAttachmentsDir(&self, taskId: &str) -> Result<PathBuf> {
        Ok(self.attachmentsDir().join(validateName("task id", taskId)?))
    }

    /// Snapshot of the current settings
    pub fn currentSettings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Mutate the settings and persist the whole map before returning
    pub fn updateSettings<F: FnOnce(&mut Settings) -> Result<()>>(&self, update: F) -> Result<()> {
        let mut settings = self.settings.write();
        let mut next = settings.clone();
        update(&mut next)?;
        saveSettings(&self.settingsPath(), &next)?;
        *settings = next;
        Ok(())
    }
}

pub type StorageState = Arc<Storage>;

/// Initialize storage under an application root, creating the data layout
pub fn initStorage(rootDir: impl Into<PathBuf>) -> Result<StorageState> {
    let rootDir = rootDir.into();
    for dir in ["data", "data/backups", "data/attachments"] {
        fs::create_dir_all(rootDir.join(dir))?;
    }

    let storage = Storage::new(&rootDir);
    info!("[initStorage] Data directory: {}", storage.dataDir().display());

    if !storage.settingsPath().exists() {
        let defaults = storage.currentSettings();
        if let Err(e) = saveSettings(&storage.settingsPath(), &defaults) {
            warn!("[initStorage] Could not write default settings: {}", e);
        }
    }

    Ok(Arc::new(storage))
}

// ============================================
// SETTINGS FILE
// ============================================

/// Load settings as defaults overlaid with the persisted file.
/// Never fails: unreadable files fall back to defaults with a warning.
pub fn loadSettings(path: &Path) -> (Settings, Option<String>) {
    if !path.exists() {
        debug!("[loadSettings] No settings file, using defaults");
        return (Settings::default(), None);
    }

    let persisted = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings: {}", e))
        .and_then(|text| {
            serde_json::from_str::<Map<String, Value>>(&text)
                .map_err(|e| format!("Failed to parse settings: {}", e))
        });

    match persisted {
        Ok(map) => {
            let (settings, rejected) = Settings::fromPersisted(map);
            if rejected.is_empty() {
                (settings, None)
            } else {
                let message = format!("Ignored invalid values for: {}", rejected.join(", "));
                warn!("[loadSettings] {}", message);
                (settings, Some(message))
            }
        }
        Err(message) => {
            warn!(path = %path.display(), "[loadSettings] {}; using defaults", message);
            (Settings::default(), Some(message))
        }
    }
}

/// Persist the full settings map (overwrite, not merge)
pub fn saveSettings(path: &Path, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    writeAtomic(path, json.as_bytes())
}
