// RPC dispatcher - routes a method name and JSON params to one command
// Replies are always { success: true, data } or { success: false, kind, error }

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::commands::dialog::{DialogHost, FileFilter};
use crate::commands::{app, attachment, backup, bundle, data, dialog, notification, settings};
use crate::error::{AppError, Result};
use crate::models::{Task, TaskDocument};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            kind: None,
            error: None,
        }
    }

    pub fn err(error: &AppError) -> Self {
        Self {
            success: false,
            data: None,
            kind: Some(error.kind()),
            error: Some(error.to_string()),
        }
    }
}

// ============================================
// PARAMS
// ============================================

/// Task ids arrive as strings or numbers
fn idString<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected a task id, got {}", other))),
    }
}

fn yes() -> bool {
    true
}

#[derive(Deserialize)]
struct KeyParams {
    key: String,
}

#[derive(Deserialize)]
struct SetSettingParams {
    key: String,
    value: Value,
}

#[derive(Deserialize)]
struct SettingsParams {
    settings: Map<String, Value>,
}

#[derive(Deserialize)]
struct DocumentParams {
    data: TaskDocument,
}

#[derive(Deserialize)]
struct ExportParams {
    data: TaskDocument,
    path: Option<PathBuf>,
}

#[derive(Deserialize)]
struct NameParams {
    name: String,
}

#[derive(Deserialize)]
struct TaskParams {
    #[serde(deserialize_with = "idString")]
    taskId: String,
}

#[derive(Deserialize)]
struct SaveAttachmentParams {
    #[serde(deserialize_with = "idString")]
    taskId: String,
    sourcePath: String,
    #[serde(default = "yes")]
    copyFile: bool,
}

#[derive(Deserialize)]
struct PastedAttachmentParams {
    #[serde(deserialize_with = "idString")]
    taskId: String,
    fileName: String,
    data: String,
}

#[derive(Deserialize)]
struct AttachmentParams {
    #[serde(deserialize_with = "idString")]
    taskId: String,
    fileName: String,
}

#[derive(Deserialize)]
struct PathParams {
    path: String,
}

#[derive(Deserialize)]
struct DueTasksParams {
    tasks: Vec<Task>,
    /// YYYY-MM-DD; the local date when absent
    today: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct OpenDialogParams {
    filters: Option<Vec<FileFilter>>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct SaveDialogParams {
    defaultName: Option<String>,
    filters: Option<Vec<FileFilter>>,
}

#[derive(Deserialize)]
struct SaveToFileParams {
    path: String,
    content: String,
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() { Value::Object(Map::new()) } else { params };
    serde_json::from_value(params).map_err(|e| AppError::malformed(format!("Invalid params: {}", e)))
}

fn toValue<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

// ============================================
// DISPATCH
// ============================================

fn dispatch(storage: &Storage, dialogs: Option<&dyn DialogHost>, method: &str, params: Value) -> Result<Value> {
    match method {
        // Settings
        "getAllSettings" => Ok(Value::Object(settings::getAllSettings(storage))),
        "getSetting" => {
            let p: KeyParams = parse(params)?;
            Ok(settings::getSetting(storage, &p.key))
        }
        "setSetting" => {
            let p: SetSettingParams = parse(params)?;
            settings::setSetting(storage, &p.key, p.value)?;
            Ok(Value::Null)
        }
        "saveAllSettings" => {
            let p: SettingsParams = parse(params)?;
            settings::saveAllSettings(storage, p.settings)?;
            Ok(Value::Null)
        }

        // Document
        "loadData" => toValue(data::loadData(storage)),
        "saveData" => {
            let p: DocumentParams = parse(params)?;
            toValue(data::saveData(storage, p.data)?)
        }

        // Backups
        "createBackup" => toValue(backup::createBackup(storage)?),
        "listBackups" => toValue(backup::listBackups(storage)),
        "restoreBackup" => {
            let p: NameParams = parse(params)?;
            toValue(backup::restoreBackup(storage, &p.name)?)
        }
        "deleteBackup" => {
            let p: NameParams = parse(params)?;
            backup::deleteBackup(storage, &p.name)?;
            Ok(Value::Null)
        }

        // Attachments
        "saveAttachment" => {
            let p: SaveAttachmentParams = parse(params)?;
            toValue(attachment::saveAttachment(storage, &p.taskId, &p.sourcePath, p.copyFile)?)
        }
        "savePastedAttachment" => {
            let p: PastedAttachmentParams = parse(params)?;
            toValue(attachment::savePastedAttachment(storage, &p.taskId, &p.fileName, &p.data)?)
        }
        "getAttachment" => {
            let p: AttachmentParams = parse(params)?;
            toValue(attachment::getAttachment(storage, &p.taskId, &p.fileName)?)
        }
        "listAttachments" => {
            let p: TaskParams = parse(params)?;
            toValue(attachment::listAttachments(storage, &p.taskId))
        }
        "deleteAttachment" => {
            let p: AttachmentParams = parse(params)?;
            attachment::deleteAttachment(storage, &p.taskId, &p.fileName)?;
            Ok(Value::Null)
        }
        "deleteTaskAttachments" => {
            let p: TaskParams = parse(params)?;
            attachment::deleteTaskAttachments(storage, &p.taskId)?;
            Ok(Value::Null)
        }

        // Bundles
        "exportWithAttachments" => {
            let p: ExportParams = parse(params)?;
            toValue(dialog::exportWithAttachmentsTo(storage, dialogs, &p.data, p.path.as_deref())?)
        }
        "importWithAttachments" => {
            let p: PathParams = parse(params)?;
            toValue(bundle::importWithAttachments(storage, &p.path)?)
        }
        "importDataUnified" => {
            let p: PathParams = parse(params)?;
            toValue(bundle::importDataUnified(storage, &p.path)?)
        }

        // Dialogs
        "showOpenDialog" => {
            let p: OpenDialogParams = parse(params)?;
            toValue(dialog::showOpenDialog(dialogs, p.filters)?)
        }
        "showSaveDialog" => {
            let p: SaveDialogParams = parse(params)?;
            toValue(dialog::showSaveDialog(dialogs, p.defaultName.as_deref(), p.filters)?)
        }
        "exportCsv" => {
            let p: SaveDialogParams = parse(params)?;
            toValue(dialog::exportCsv(dialogs, p.defaultName.as_deref())?)
        }
        "pickAttachmentFile" => toValue(dialog::pickAttachmentFile(dialogs)?),

        // Utility
        "checkDueTasks" => {
            let p: DueTasksParams = parse(params)?;
            let due = match p.today {
                Some(today) => notification::checkDueTasks(&p.tasks, &today),
                None => notification::checkDueTasksToday(&p.tasks),
            };
            toValue(due)
        }
        "saveToFile" => {
            let p: SaveToFileParams = parse(params)?;
            app::saveToFile(&p.path, &p.content)?;
            Ok(Value::Null)
        }
        "getAppInfo" => toValue(app::getAppInfo(storage, dialogs.is_some())),

        _ => Err(AppError::malformed(format!("Unknown method: {}", method))),
    }
}

/// Run one RPC call. Never panics and never fails: errors become error replies.
pub fn invoke(storage: &Storage, dialogs: Option<&dyn DialogHost>, method: &str, params: Value) -> Reply {
    debug!("[invoke] {}", method);
    match dispatch(storage, dialogs, method, params) {
        Ok(data) => Reply::ok(data),
        Err(e) => {
            warn!("[invoke] {} failed ({}): {}", method, e.kind(), e);
            Reply::err(&e)
        }
    }
}
