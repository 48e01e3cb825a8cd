// Configuration model for the board
// Known options are typed; anything else the UI stores rides along in `extra`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Main window geometry remembered between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 900,
            extra: Map::new(),
        }
    }
}

/// All settings (stored in data/settings.json)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: String,
    pub autoBackup: bool,
    /// Hours between automatic backups
    pub backupInterval: u32,
    /// Days a backup is kept
    pub backupRetention: u32,
    pub maxBackups: u32,
    pub lastBackup: Option<String>,
    pub compactView: bool,
    pub showCompletedTasks: bool,
    pub defaultPriority: String,
    pub windowState: WindowState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            autoBackup: true,
            backupInterval: 24,
            backupRetention: 30,
            maxBackups: 10,
            lastBackup: None,
            compactView: false,
            showCompletedTasks: true,
            defaultPriority: "Medium".to_string(),
            windowState: WindowState::default(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Set one option by name. Unknown names go to the passthrough bag.
    /// On a type mismatch the current value is left untouched.
    pub fn applyValue(&mut self, key: &str, value: Value) -> Result<(), serde_json::Error> {
        match key {
            "theme" => self.theme = serde_json::from_value(value)?,
            "autoBackup" => self.autoBackup = serde_json::from_value(value)?,
            "backupInterval" => self.backupInterval = serde_json::from_value(value)?,
            "backupRetention" => self.backupRetention = serde_json::from_value(value)?,
            "maxBackups" => self.maxBackups = serde_json::from_value(value)?,
            "lastBackup" => self.lastBackup = serde_json::from_value(value)?,
            "compactView" => self.compactView = serde_json::from_value(value)?,
            "showCompletedTasks" => self.showCompletedTasks = serde_json::from_value(value)?,
            "defaultPriority" => self.defaultPriority = serde_json::from_value(value)?,
            "windowState" => self.windowState = serde_json::from_value(value)?,
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Defaults overlaid with persisted values, key by key.
    /// Returns the merged settings and the keys whose persisted value was rejected.
    pub fn fromPersisted(persisted: Map<String, Value>) -> (Self, Vec<String>) {
        let mut settings = Self::default();
        let mut rejected = Vec::new();
        for (key, value) in persisted {
            if settings.applyValue(&key, value).is_err() {
                rejected.push(key);
            }
        }
        (settings, rejected)
    }

    /// Flat map view, as the UI sees it
    pub fn toMap(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.toMap().remove(key)
    }
}
