// Bundle commands - export the document with its copied attachments as a zip, and import it back
//
// Layout:
//   kanban_data.json
//   attachments/<taskId>/<fileName>

use serde_json::{Map, Value, json};
use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{AppError, Result};
use crate::models::TaskDocument;
use crate::storage::{validateName, Storage};
use super::attachment::{discardPartial, LINK_SUFFIX};
use super::dialog::MAX_ATTACHMENT_SIZE;

pub const DOCUMENT_ENTRY: &str = "kanban_data.json";
pub const ATTACHMENTS_PREFIX: &str = "attachments/";

/// Hints for the compatibility lookup of older or hand-made bundles
const DOCUMENT_NAME_HINTS: [&str; 3] = ["task", "export", "data"];

#[derive(Debug, serde::Serialize)]
pub struct ExportResult {
    pub path: String,
    pub attachmentsCount: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct ImportResult {
    pub data: TaskDocument,
    pub attachmentsCount: usize,
}

// ============================================
// EXPORT
// ============================================

/// Copied attachment files of one task, sorted by name. Link markers are skipped.
fn bundledFiles(taskDir: &Path) -> Vec<PathBuf> {
    WalkDir::new(taskDir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            !name.ends_with(LINK_SUFFIX) && !name.ends_with(".meta")
        })
        .map(|e| e.into_path())
        .collect()
}

fn addFileToZip<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &Path,
    zipName: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut buf = Vec::new();
    File::open(path)?.read_to_end(&mut buf)?;
    zip.start_file(zipName, options)?;
    zip.write_all(&buf)?;
    Ok(())
}

fn writeBundle(storage: &Storage, document: &TaskDocument, file: File) -> Result<usize> {
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut attachmentMap = Map::new();
    let mut attachmentsCount = 0;

    for task in &document.tasks {
        let Some(taskId) = task.id() else { continue };
        if attachmentMap.contains_key(&taskId) {
            continue;
        }
        let taskDir = match storage.taskAttachmentsDir(&taskId) {
            Ok(dir) if dir.is_dir() => dir,
            Ok(_) => continue,
            Err(e) => {
                warn!("[exportWithAttachments] Skipping task: {}", e);
                continue;
            }
        };

        let mut entries = Vec::new();
        for path in bundledFiles(&taskDir) {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
            let zipName = format!("{}{}/{}", ATTACHMENTS_PREFIX, taskId, name);
            addFileToZip(&mut zip, &path, &zipName, options)?;
            entries.push(json!({"name": name, "path": zipName}));
            attachmentsCount += 1;
        }
        attachmentMap.insert(taskId, Value::Array(entries));
    }

    let mut exported = document.clone();
    exported.extra.insert("attachments".into(), Value::Object(attachmentMap));
    exported.extra.insert("hasAttachments".into(), Value::Bool(attachmentsCount > 0));

    zip.start_file(DOCUMENT_ENTRY, options)?;
    zip.write_all(serde_json::to_string_pretty(&exported)?.as_bytes())?;

    let file = zip.finish()?;
    file.sync_all()?;
    Ok(attachmentsCount)
}

/// Write the document and every copied attachment of its tasks to a zip bundle
pub fn exportWithAttachments(storage: &Storage, document: &TaskDocument, destPath: &Path) -> Result<ExportResult> {
    info!("[exportWithAttachments] Exporting {} tasks to {}", document.tasks.len(), destPath.display());

    if let Some(parent) = destPath.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmpPath = destPath.with_file_name(format!(
        ".{}.{}.tmp",
        destPath.file_name().and_then(|n| n.to_str()).unwrap_or("bundle"),
        uuid::Uuid::new_v4().simple()
    ));

    let written = {
        let _guard = storage.attachmentLock.lock();
        File::create(&tmpPath)
            .map_err(AppError::from)
            .and_then(|file| writeBundle(storage, document, file))
    };

    let attachmentsCount = match written.and_then(|count| {
        fs::rename(&tmpPath, destPath)?;
        Ok(count)
    }) {
        Ok(count) => count,
        Err(e) => {
            warn!("[exportWithAttachments] ERROR: {}", e);
            let _ = fs::remove_file(&tmpPath);
            return Err(e);
        }
    };

    info!("[exportWithAttachments] SUCCESS - {} attachments", attachmentsCount);
    Ok(ExportResult {
        path: destPath.to_string_lossy().to_string(),
        attachmentsCount,
    })
}

// ============================================
// IMPORT
// ============================================

/// Resolve the document entry of an archive.
/// The fixed name wins; otherwise a JSON entry whose name hints at task data,
/// otherwise the first JSON entry. Entries under attachments/ never qualify.
pub fn findDocumentEntry<'a>(names: &[&'a str]) -> Option<&'a str> {
    if names.contains(&DOCUMENT_ENTRY) {
        return Some(DOCUMENT_ENTRY);
    }

    let candidates: Vec<&str> = names
        .iter()
        .copied()
        .filter(|n| !n.starts_with(ATTACHMENTS_PREFIX))
        .filter(|n| n.to_ascii_lowercase().ends_with(".json"))
        .collect();

    candidates
        .iter()
        .copied()
        .find(|n| {
            let lower = n.to_ascii_lowercase();
            DOCUMENT_NAME_HINTS.iter().any(|hint| lower.contains(hint))
        })
        .or_else(|| candidates.first().copied())
}

fn openArchive(path: &Path) -> Result<ZipArchive<File>> {
    if !path.is_file() {
        return Err(AppError::notFound("File not found"));
    }
    Ok(ZipArchive::new(File::open(path)?)?)
}

fn readDocumentEntry(archive: &mut ZipArchive<File>, name: &str) -> Result<TaskDocument> {
    let mut bytes = Vec::new();
    archive.by_name(name)?.read_to_end(&mut bytes)?;
    let text = String::from_utf8(bytes).map_err(|_| AppError::malformed(format!("{} is not valid UTF-8", name)))?;
    Ok(TaskDocument::fromJson(&text)?)
}

/// Destination of an archive entry, if it is an attachment file.
/// Only attachments/<taskId>/<fileName> with plain components is accepted.
fn attachmentTarget(storage: &Storage, entryName: &str) -> Option<PathBuf> {
    let rest = entryName.strip_prefix(ATTACHMENTS_PREFIX)?;
    let parts: Vec<&str> = rest.split('/').collect();
    let [taskId, fileName] = parts.as_slice() else {
        warn!("[extractAttachments] Skipping unexpected entry {}", entryName);
        return None;
    };
    match (storage.taskAttachmentsDir(taskId), validateName("file name", fileName)) {
        (Ok(dir), Ok(_)) => Some(dir.join(fileName)),
        _ => {
            warn!("[extractAttachments] Skipping unsafe entry {}", entryName);
            None
        }
    }
}

/// Extract every attachment entry into managed storage; returns the number of files written
fn extractAttachments(storage: &Storage, archive: &mut ZipArchive<File>) -> Result<usize> {
    let _guard = storage.attachmentLock.lock();
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(dest) = attachmentTarget(storage, entry.name()) else {
            continue;
        };
        if entry.size() > MAX_ATTACHMENT_SIZE {
            warn!("[extractAttachments] Skipping {} ({} bytes, over the attachment limit)", entry.name(), entry.size());
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        // The declared size can lie; never copy more than the limit
        let mut limited = entry.take(MAX_ATTACHMENT_SIZE + 1);
        let copied = discardPartial(&dest, File::create(&dest).and_then(|mut out| std::io::copy(&mut limited, &mut out)))?;
        if copied > MAX_ATTACHMENT_SIZE {
            warn!("[extractAttachments] Skipping {}: content exceeds the attachment limit", dest.display());
            let _ = fs::remove_file(&dest);
            continue;
        }
        extracted += 1;
    }

    Ok(extracted)
}

/// Import a bundle written by exportWithAttachments
pub fn importWithAttachments(storage: &Storage, path: &str) -> Result<ImportResult> {
    info!("[importWithAttachments] Called with: {}", path);
    let mut archive = openArchive(Path::new(path))?;

    if archive.index_for_name(DOCUMENT_ENTRY).is_none() {
        return Err(AppError::malformed(format!("Invalid bundle: no {} found", DOCUMENT_ENTRY)));
    }

    let data = readDocumentEntry(&mut archive, DOCUMENT_ENTRY)?;
    let attachmentsCount = extractAttachments(storage, &mut archive)?;
    info!("[importWithAttachments] SUCCESS - {} attachments", attachmentsCount);
    Ok(ImportResult { data, attachmentsCount })
}

/// Import either a zip bundle (by extension) or a plain JSON document
pub fn importDataUnified(storage: &Storage, path: &str) -> Result<ImportResult> {
    info!("[importDataUnified] Called with: {}", path);
    let filePath = Path::new(path);

    let isZip = filePath
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));

    if !isZip {
        if !filePath.is_file() {
            return Err(AppError::notFound("File not found"));
        }
        let data = TaskDocument::fromJson(&fs::read_to_string(filePath)?)?;
        return Ok(ImportResult { data, attachmentsCount: 0 });
    }

    let mut archive = openArchive(filePath)?;
    let entryName = {
        let names: Vec<&str> = archive.file_names().collect();
        findDocumentEntry(&names).map(str::to_string)
    };
    let Some(entryName) = entryName else {
        return Err(AppError::malformed("No JSON data found in ZIP"));
    };
    if entryName != DOCUMENT_ENTRY {
        info!("[importDataUnified] Using {} as document entry", entryName);
    }

    let data = readDocumentEntry(&mut archive, &entryName)?;
    let attachmentsCount = extractAttachments(storage, &mut archive)?;
    Ok(ImportResult { data, attachmentsCount })
}
