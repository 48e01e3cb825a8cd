// Settings commands

use serde_json::{Map, Value};
use tracing::info;

use crate::error::{AppError, Result};
use crate::storage::Storage;

pub fn getAllSettings(storage: &Storage) -> Map<String, Value> {
    storage.settings.read().toMap()
}

/// Value of one option, null when unset
pub fn getSetting(storage: &Storage, key: &str) -> Value {
    storage.settings.read().get(key).unwrap_or(Value::Null)
}

pub fn setSetting(storage: &Storage, key: &str, value: Value) -> Result<()> {
    info!("[setSetting] {}", key);
    storage.updateSettings(|settings| {
        settings
            .applyValue(key, value)
            .map_err(|e| AppError::malformed(format!("Invalid value for {}: {}", key, e)))
    })
}

/// Apply several options at once; nothing is persisted if any value is invalid
pub fn saveAllSettings(storage: &Storage, values: Map<String, Value>) -> Result<()> {
    info!("[saveAllSettings] {} keys", values.len());
    storage.updateSettings(|settings| {
        for (key, value) in values {
            settings
                .applyValue(&key, value)
                .map_err(|e| AppError::malformed(format!("Invalid value for {}: {}", key, e)))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{initStorage, loadSettings};
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let storage = initStorage(dir.path()).unwrap();

        setSetting(&storage, "theme", json!("dark")).unwrap();
        assert_eq!(getSetting(&storage, "theme"), json!("dark"));
        assert_eq!(getSetting(&storage, "nothingHere"), Value::Null);

        let (persisted, _) = loadSettings(&storage.settingsPath());
        assert_eq!(persisted.theme, "dark");
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let storage = initStorage(dir.path()).unwrap();
        let err = setSetting(&storage, "autoBackup", json!("yes")).unwrap_err();
        assert_eq!(err.kind(), "malformedInput");
        assert_eq!(getSetting(&storage, "autoBackup"), json!(true));
    }

    #[test]
    fn test_save_all_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = initStorage(dir.path()).unwrap();

        let mut values = Map::new();
        values.insert("compactView".into(), json!(true));
        values.insert("windowState".into(), json!({"width": 1024, "height": 768}));
        saveAllSettings(&storage, values).unwrap();
        let all = getAllSettings(&storage);
        assert_eq!(all["compactView"], json!(true));
        assert_eq!(all["windowState"], json!({"width": 1024, "height": 768}));

        let mut bad = Map::new();
        bad.insert("theme".into(), json!("dark"));
        bad.insert("maxBackups".into(), json!(-1));
        assert!(saveAllSettings(&storage, bad).is_err());
        assert_eq!(getSetting(&storage, "theme"), json!("light"));
    }
}
