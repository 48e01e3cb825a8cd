// App commands - host information and plain file output

use std::path::Path;
use tracing::info;

use crate::error::{AppError, Result};
use crate::storage::{writeAtomic, Storage};
use crate::{APP_NAME, APP_VERSION};

#[derive(Debug, serde::Serialize)]
pub struct AppInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub dataDir: String,
    pub hasDialogs: bool,
    /// Why settings fell back to defaults at startup, if they did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settingsWarning: Option<String>,
}

pub fn getAppInfo(storage: &Storage, hasDialogs: bool) -> AppInfo {
    AppInfo {
        name: APP_NAME,
        version: APP_VERSION,
        dataDir: storage.dataDir().to_string_lossy().to_string(),
        hasDialogs,
        settingsWarning: storage.settingsWarning.clone(),
    }
}

/// Write UI-produced text (CSV or JSON exports) to a chosen path
pub fn saveToFile(path: &str, content: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AppError::malformed("Path is required"));
    }
    writeAtomic(Path::new(path), content.as_bytes())?;
    info!("[saveToFile] Wrote {} bytes to {}", content.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::initStorage;
    use std::fs;

    #[test]
    fn test_app_info() {
        let dir = tempfile::tempdir().unwrap();
        let storage = initStorage(dir.path()).unwrap();
        let info = getAppInfo(&storage, false);
        assert_eq!(info.name, "Kanban Board");
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert!(info.dataDir.ends_with("data"));
        assert!(!info.hasDialogs);

        let value = serde_json::to_value(&info).unwrap();
        assert!(value.get("settingsWarning").is_none());
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("board.csv");
        saveToFile(path.to_str().unwrap(), "title,status\nA,todo\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "title,status\nA,todo\n");
        assert_eq!(saveToFile("", "x").unwrap_err().kind(), "malformedInput");
    }
}
