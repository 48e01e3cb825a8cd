// Dialog commands - native file pickers are provided by the embedding host

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::TaskDocument;
use crate::storage::Storage;
use super::bundle::{exportWithAttachments, ExportResult};
use super::common::isImage;

/// Largest file accepted from the attachment picker
pub const MAX_ATTACHMENT_SIZE: u64 = 5 * 1024 * 1024;

pub const DEFAULT_EXPORT_NAME: &str = "kanban_export.json";
pub const DEFAULT_CSV_NAME: &str = "kanban_export.csv";
pub const DEFAULT_BUNDLE_NAME: &str = "kanban_export_bundle.zip";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFilter {
    pub name: String,
    /// Extensions without the dot; "*" matches everything
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn allFiles() -> Self {
        Self::new("All Files", &["*"])
    }
}

pub fn jsonFilters() -> Vec<FileFilter> {
    vec![FileFilter::new("JSON Files", &["json"]), FileFilter::allFiles()]
}

fn attachmentFilters() -> Vec<FileFilter> {
    vec![
        FileFilter::new("Images", &["jpg", "jpeg", "png", "gif", "bmp", "webp"]),
        FileFilter::new("Documents", &["pdf", "doc", "docx", "txt", "xls", "xlsx"]),
        FileFilter::allFiles(),
    ]
}

/// Native open/save pickers. Returning None means the user dismissed the dialog.
pub trait DialogHost: Send + Sync {
    fn pickOpenFile(&self, filters: &[FileFilter]) -> Option<PathBuf>;
    fn pickSaveFile(&self, defaultName: &str, filters: &[FileFilter]) -> Option<PathBuf>;
}

fn requireHost(dialogs: Option<&dyn DialogHost>) -> Result<&dyn DialogHost> {
    dialogs.ok_or_else(|| AppError::Unavailable("Window not available".into()))
}

#[derive(Debug, Serialize)]
pub struct OpenedFile {
    pub path: String,
    /// Text content; None for zip bundles, which are imported by path
    pub content: Option<String>,
    pub isZip: bool,
}

#[derive(Debug, Serialize)]
pub struct ChosenPath {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct PickedFile {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub isImage: bool,
}

pub fn showOpenDialog(dialogs: Option<&dyn DialogHost>, filters: Option<Vec<FileFilter>>) -> Result<OpenedFile> {
    let host = requireHost(dialogs)?;
    let path = host
        .pickOpenFile(&filters.unwrap_or_else(jsonFilters))
        .ok_or(AppError::Cancelled)?;

    let isZip = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    let content = if isZip { None } else { Some(fs::read_to_string(&path)?) };

    info!("[showOpenDialog] Selected {}", path.display());
    Ok(OpenedFile {
        path: path.to_string_lossy().to_string(),
        content,
        isZip,
    })
}

pub fn showSaveDialog(
    dialogs: Option<&dyn DialogHost>,
    defaultName: Option<&str>,
    filters: Option<Vec<FileFilter>>,
) -> Result<ChosenPath> {
    let host = requireHost(dialogs)?;
    let path = host
        .pickSaveFile(defaultName.unwrap_or(DEFAULT_EXPORT_NAME), &filters.unwrap_or_else(jsonFilters))
        .ok_or(AppError::Cancelled)?;
    Ok(ChosenPath {
        path: path.to_string_lossy().to_string(),
    })
}

/// Save dialog preset for CSV exports
pub fn exportCsv(dialogs: Option<&dyn DialogHost>, defaultName: Option<&str>) -> Result<ChosenPath> {
    showSaveDialog(
        dialogs,
        Some(defaultName.unwrap_or(DEFAULT_CSV_NAME)),
        Some(vec![FileFilter::new("CSV Files", &["csv"]), FileFilter::allFiles()]),
    )
}

/// Reject files above the attachment ceiling
pub fn checkAttachmentSize(size: u64) -> Result<()> {
    if size > MAX_ATTACHMENT_SIZE {
        return Err(AppError::TooLarge(format!(
            "File too large. Maximum size is 5MB, file is {:.1}MB",
            size as f64 / 1024.0 / 1024.0
        )));
    }
    Ok(())
}

/// Let the user pick a file to attach; the size ceiling is enforced here
pub fn pickAttachmentFile(dialogs: Option<&dyn DialogHost>) -> Result<PickedFile> {
    let host = requireHost(dialogs)?;
    let path = host.pickOpenFile(&attachmentFilters()).ok_or(AppError::Cancelled)?;

    let size = fs::metadata(&path)?.len();
    checkAttachmentSize(size)?;

    Ok(PickedFile {
        name: path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string(),
        path: path.to_string_lossy().to_string(),
        size,
        isImage: isImage(&path),
    })
}

/// Export a bundle to a path the caller chose, or ask the dialog host for one
pub fn exportWithAttachmentsTo(
    storage: &Storage,
    dialogs: Option<&dyn DialogHost>,
    document: &TaskDocument,
    destPath: Option<&Path>,
) -> Result<ExportResult> {
    if let Some(path) = destPath {
        return exportWithAttachments(storage, document, path);
    }

    let host = requireHost(dialogs)?;
    let path = host
        .pickSaveFile(DEFAULT_BUNDLE_NAME, &[FileFilter::new("ZIP Files", &["zip"]), FileFilter::allFiles()])
        .ok_or(AppError::Cancelled)?;
    exportWithAttachments(storage, document, &path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::initStorage;
    use parking_lot::Mutex;

    /// Dialog host answering every request with a fixed path
    pub(crate) struct FakeDialogs {
        pub answer: Option<PathBuf>,
        pub lastDefaultName: Mutex<Option<String>>,
    }

    impl FakeDialogs {
        pub(crate) fn answering(answer: Option<PathBuf>) -> Self {
            Self {
                answer,
                lastDefaultName: Mutex::new(None),
            }
        }
    }

    impl DialogHost for FakeDialogs {
        fn pickOpenFile(&self, _filters: &[FileFilter]) -> Option<PathBuf> {
            self.answer.clone()
        }

        fn pickSaveFile(&self, defaultName: &str, _filters: &[FileFilter]) -> Option<PathBuf> {
            *self.lastDefaultName.lock() = Some(defaultName.to_string());
            self.answer.clone()
        }
    }

    #[test]
    fn test_no_host_is_unavailable() {
        assert_eq!(showOpenDialog(None, None).unwrap_err().kind(), "unavailable");
        assert_eq!(pickAttachmentFile(None).unwrap_err().kind(), "unavailable");
        assert_eq!(showSaveDialog(None, None, None).unwrap_err().to_string(), "Window not available");
    }

    #[test]
    fn test_dismissed_is_cancelled() {
        let dialogs = FakeDialogs::answering(None);
        assert_eq!(showOpenDialog(Some(&dialogs), None).unwrap_err().kind(), "cancelled");
        assert_eq!(exportCsv(Some(&dialogs), None).unwrap_err().kind(), "cancelled");
        assert_eq!(dialogs.lastDefaultName.lock().as_deref(), Some(DEFAULT_CSV_NAME));
    }

    #[test]
    fn test_open_reads_text_but_not_zip() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("board.json");
        fs::write(&json, r#"{"tasks": []}"#).unwrap();
        let opened = showOpenDialog(Some(&FakeDialogs::answering(Some(json))), None).unwrap();
        assert_eq!(opened.content.as_deref(), Some(r#"{"tasks": []}"#));
        assert!(!opened.isZip);

        let zip = dir.path().join("bundle.ZIP");
        fs::write(&zip, b"PK\x03\x04").unwrap();
        let opened = showOpenDialog(Some(&FakeDialogs::answering(Some(zip))), None).unwrap();
        assert!(opened.isZip);
        assert!(opened.content.is_none());
    }

    #[test]
    fn test_attachment_size_ceiling() {
        assert!(checkAttachmentSize(MAX_ATTACHMENT_SIZE).is_ok());
        let err = checkAttachmentSize(6 * 1024 * 1024 + 100 * 1024).unwrap_err();
        assert_eq!(err.kind(), "tooLarge");
        assert_eq!(err.to_string(), "File too large. Maximum size is 5MB, file is 6.1MB");
    }

    #[test]
    fn test_pick_attachment_file() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("shot.PNG");
        fs::write(&small, vec![0u8; 1024]).unwrap();
        let picked = pickAttachmentFile(Some(&FakeDialogs::answering(Some(small)))).unwrap();
        assert_eq!(picked.name, "shot.PNG");
        assert_eq!(picked.size, 1024);
        assert!(picked.isImage);

        let big = dir.path().join("big.bin");
        fs::File::create(&big).unwrap().set_len(MAX_ATTACHMENT_SIZE + 1).unwrap();
        let err = pickAttachmentFile(Some(&FakeDialogs::answering(Some(big)))).unwrap_err();
        assert_eq!(err.kind(), "tooLarge");
    }

    #[test]
    fn test_bundle_export_asks_for_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = initStorage(dir.path().join("app")).unwrap();
        let target = dir.path().join("chosen.zip");
        let dialogs = FakeDialogs::answering(Some(target.clone()));

        let result = exportWithAttachmentsTo(&storage, Some(&dialogs), &TaskDocument::default(), None).unwrap();
        assert_eq!(result.path, target.to_string_lossy());
        assert!(target.is_file());
        assert_eq!(dialogs.lastDefaultName.lock().as_deref(), Some(DEFAULT_BUNDLE_NAME));

        let explicit = dir.path().join("explicit.zip");
        exportWithAttachmentsTo(&storage, None, &TaskDocument::default(), Some(&explicit)).unwrap();
        assert!(explicit.is_file());
    }
}
