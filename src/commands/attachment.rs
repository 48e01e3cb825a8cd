// Attachment commands - per-task files, copied into storage or linked in place

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{AttachmentData, AttachmentInfo};
use crate::storage::{validateName, Storage};
use super::common::{isImage, mimeType};

/// Suffix of link marker files; the marker body is the external path
pub const LINK_SUFFIX: &str = ".link";

fn linkMarkerName(fileName: &str) -> String {
    format!("{}{}", fileName, LINK_SUFFIX)
}

/// True if the name is taken by a copied file or a link marker
fn isTaken(dir: &Path, fileName: &str) -> bool {
    dir.join(fileName).exists() || dir.join(linkMarkerName(fileName)).exists()
}

/// First free name in dir: "photo.png", then "photo_1.png", "photo_2.png", ...
pub fn uniqueFileName(dir: &Path, fileName: &str) -> String {
    if !isTaken(dir, fileName) {
        return fileName.to_string();
    }

    let path = Path::new(fileName);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(fileName);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    (1u32..)
        .map(|n| format!("{}_{}{}", stem, n, extension))
        .find(|candidate| !isTaken(dir, candidate))
        .unwrap_or_else(|| fileName.to_string())
}

fn copiedInfo(path: &Path) -> Result<AttachmentInfo> {
    Ok(AttachmentInfo {
        name: path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string(),
        path: path.to_string_lossy().to_string(),
        size: fs::metadata(path)?.len(),
        isImage: isImage(path),
        linked: false,
        exists: true,
        originalPath: None,
    })
}

/// Remove a partially written file so it never shows up as an attachment
pub(crate) fn discardPartial<T>(dest: &Path, written: std::io::Result<T>) -> Result<T> {
    written.map_err(|e| {
        warn!("[discardPartial] Writing {} failed: {}", dest.display(), e);
        let _ = fs::remove_file(dest);
        AppError::from(e)
    })
}

fn readLinkTarget(marker: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(fs::read_to_string(marker)?.trim()))
}

/// Attach a file to a task, either as a copy in managed storage or as a link
pub fn saveAttachment(storage: &Storage, taskId: &str, sourcePath: &str, copyFile: bool) -> Result<AttachmentInfo> {
    info!("[saveAttachment] task {} <- {} (copy: {})", taskId, sourcePath, copyFile);

    let source = PathBuf::from(sourcePath);
    if !source.is_file() {
        return Err(AppError::notFound("Source file not found"));
    }
    let sourceName = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::malformed("Source file name is not valid UTF-8"))?
        .to_string();

    let taskDir = storage.taskAttachmentsDir(taskId)?;
    let _guard = storage.attachmentLock.lock();
    fs::create_dir_all(&taskDir)?;

    let name = uniqueFileName(&taskDir, &sourceName);

    if copyFile {
        let dest = taskDir.join(&name);
        discardPartial(&dest, fs::copy(&source, &dest))?;
        info!("[saveAttachment] Copied as {}", name);
        copiedInfo(&dest)
    } else {
        let absolute = fs::canonicalize(&source)?;
        let absoluteStr = absolute.to_string_lossy().to_string();
        fs::write(taskDir.join(linkMarkerName(&name)), &absoluteStr)?;
        info!("[saveAttachment] Linked as {}", name);
        Ok(AttachmentInfo {
            name,
            path: absoluteStr.clone(),
            size: fs::metadata(&absolute)?.len(),
            isImage: isImage(&absolute),
            linked: true,
            exists: true,
            originalPath: Some(absoluteStr),
        })
    }
}

/// Decode inline (base64) data, dropping a "data:<mime>;base64," prefix if present
pub fn decodeInlineData(data: &str) -> Result<Vec<u8>> {
    let payload = data.split_once(',').map(|(_, b)| b).unwrap_or(data);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::malformed(format!("Invalid attachment data: {}", e)))
}

/// Save pasted content (clipboard images etc.) as a copied attachment
pub fn savePastedAttachment(storage: &Storage, taskId: &str, fileName: &str, data: &str) -> Result<AttachmentInfo> {
    validateName("file name", fileName)?;
    let bytes = decodeInlineData(data)?;

    let taskDir = storage.taskAttachmentsDir(taskId)?;
    let _guard = storage.attachmentLock.lock();
    fs::create_dir_all(&taskDir)?;

    let dest = taskDir.join(uniqueFileName(&taskDir, fileName));
    discardPartial(&dest, fs::write(&dest, &bytes))?;
    info!("[savePastedAttachment] Wrote {} bytes to {}", bytes.len(), dest.display());
    copiedInfo(&dest)
}

/// Attachment content as a data URL. Links resolve to their external file.
pub fn getAttachment(storage: &Storage, taskId: &str, fileName: &str) -> Result<AttachmentData> {
    let taskDir = storage.taskAttachmentsDir(taskId)?;
    validateName("file name", fileName)?;

    let marker = taskDir.join(linkMarkerName(fileName));
    let linked = marker.is_file();
    let path = if linked {
        readLinkTarget(&marker)?
    } else {
        taskDir.join(fileName)
    };

    if !path.is_file() {
        return Err(AppError::notFound("File not found"));
    }

    let bytes = fs::read(&path)?;
    let mime = mimeType(&path);
    Ok(AttachmentData {
        name: path.file_name().and_then(|n| n.to_str()).unwrap_or(fileName).to_string(),
        data: format!("data:{};base64,{}", mime, STANDARD.encode(&bytes)),
        mimeType: mime.to_string(),
        size: bytes.len() as u64,
        linked,
    })
}

/// Attachments of a task sorted by name; empty when the task has none
pub fn listAttachments(storage: &Storage, taskId: &str) -> Vec<AttachmentInfo> {
    let taskDir = match storage.taskAttachmentsDir(taskId) {
        Ok(d) => d,
        Err(e) => {
            warn!("[listAttachments] {}", e);
            return Vec::new();
        }
    };

    let entries = match fs::read_dir(&taskDir) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    let mut attachments: Vec<AttachmentInfo> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter_map(|path| {
            let fileName = path.file_name()?.to_str()?.to_string();
            match fileName.strip_suffix(LINK_SUFFIX) {
                Some(name) => {
                    let target = match readLinkTarget(&path) {
                        Ok(target) => target,
                        Err(e) => {
                            warn!("[listAttachments] Skipping unreadable link marker {}: {}", fileName, e);
                            return None;
                        }
                    };
                    let size = fs::metadata(&target).ok().filter(|m| m.is_file()).map(|m| m.len());
                    Some(AttachmentInfo {
                        name: name.to_string(),
                        path: target.to_string_lossy().to_string(),
                        size: size.unwrap_or(0),
                        isImage: isImage(&target),
                        linked: true,
                        exists: size.is_some(),
                        originalPath: Some(target.to_string_lossy().to_string()),
                    })
                }
                None => copiedInfo(&path).ok(),
            }
        })
        .collect();

    attachments.sort_by(|a, b| a.name.cmp(&b.name));
    attachments
}

/// Remove a copied file and/or its link marker; drops the task directory once empty
pub fn deleteAttachment(storage: &Storage, taskId: &str, fileName: &str) -> Result<()> {
    let taskDir = storage.taskAttachmentsDir(taskId)?;
    validateName("file name", fileName)?;

    let mut deleted = false;
    for path in [taskDir.join(fileName), taskDir.join(linkMarkerName(fileName))] {
        if path.is_file() {
            fs::remove_file(&path)?;
            deleted = true;
        }
    }

    let isEmpty = fs::read_dir(&taskDir).map(|mut d| d.next().is_none()).unwrap_or(false);
    if isEmpty {
        fs::remove_dir(&taskDir)?;
    }

    if !deleted {
        return Err(AppError::notFound("File not found"));
    }
    info!("[deleteAttachment] Deleted {} from task {}", fileName, taskId);
    Ok(())
}

/// Remove every attachment of a task (idempotent)
pub fn deleteTaskAttachments(storage: &Storage, taskId: &str) -> Result<()> {
    let taskDir = storage.taskAttachmentsDir(taskId)?;
    if taskDir.exists() {
        fs::remove_dir_all(&taskDir)?;
        info!("[deleteTaskAttachments] Removed attachments of task {}", taskId);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::initStorage;

    fn setup() -> (tempfile::TempDir, crate::storage::StorageState, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let storage = initStorage(dir.path().join("app")).unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        (dir, storage, outside)
    }

    #[test]
    fn test_collision_renaming() {
        let (_dir, storage, outside) = setup();
        fs::create_dir_all(outside.join("a")).unwrap();
        fs::create_dir_all(outside.join("b")).unwrap();
        fs::write(outside.join("a").join("photo.png"), b"first").unwrap();
        fs::write(outside.join("b").join("photo.png"), b"second").unwrap();

        let first = saveAttachment(&storage, "t1", outside.join("a/photo.png").to_str().unwrap(), true).unwrap();
        let second = saveAttachment(&storage, "t1", outside.join("b/photo.png").to_str().unwrap(), true).unwrap();
        assert_eq!(first.name, "photo.png");
        assert_eq!(second.name, "photo_1.png");
        assert!(first.isImage);

        let a = getAttachment(&storage, "t1", "photo.png").unwrap();
        let b = getAttachment(&storage, "t1", "photo_1.png").unwrap();
        assert_eq!(a.data, format!("data:image/png;base64,{}", STANDARD.encode(b"first")));
        assert_eq!(b.data, format!("data:image/png;base64,{}", STANDARD.encode(b"second")));
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_unique_name_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README"), b"x").unwrap();
        fs::write(dir.path().join("README_1"), b"x").unwrap();
        assert_eq!(uniqueFileName(dir.path(), "README"), "README_2");
        assert_eq!(uniqueFileName(dir.path(), "other"), "other");
    }

    #[test]
    fn test_unique_name_considers_link_markers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc.pdf.link"), b"/somewhere/doc.pdf").unwrap();
        assert_eq!(uniqueFileName(dir.path(), "doc.pdf"), "doc_1.pdf");
    }

    #[test]
    fn test_missing_source() {
        let (_dir, storage, outside) = setup();
        let missing = outside.join("nope.txt");
        let err = saveAttachment(&storage, "t1", missing.to_str().unwrap(), true).unwrap_err();
        assert_eq!(err.kind(), "notFound");
        assert!(!storage.attachmentsDir().join("t1").exists());
    }

    #[test]
    fn test_link_attachment_lifecycle() {
        let (_dir, storage, outside) = setup();
        let source = outside.join("spec.pdf");
        fs::write(&source, b"%PDF-1.4").unwrap();

        let info = saveAttachment(&storage, "t2", source.to_str().unwrap(), false).unwrap();
        assert!(info.linked);
        assert_eq!(info.name, "spec.pdf");
        assert_eq!(info.size, 8);
        let marker = storage.attachmentsDir().join("t2").join("spec.pdf.link");
        assert_eq!(PathBuf::from(fs::read_to_string(&marker).unwrap()), fs::canonicalize(&source).unwrap());
        // The external file is not copied
        assert!(!storage.attachmentsDir().join("t2").join("spec.pdf").exists());

        let data = getAttachment(&storage, "t2", "spec.pdf").unwrap();
        assert!(data.linked);
        assert_eq!(data.mimeType, "application/pdf");

        let listed = listAttachments(&storage, "t2");
        assert_eq!(listed.len(), 1);
        assert!(listed[0].exists);
        assert_eq!(listed[0].size, 8);

        // Target disappears: still listed, but not retrievable
        fs::remove_file(&source).unwrap();
        let listed = listAttachments(&storage, "t2");
        assert_eq!(listed[0].name, "spec.pdf");
        assert!(!listed[0].exists);
        assert_eq!(listed[0].size, 0);
        assert_eq!(getAttachment(&storage, "t2", "spec.pdf").unwrap_err().kind(), "notFound");

        deleteAttachment(&storage, "t2", "spec.pdf").unwrap();
        assert!(!storage.attachmentsDir().join("t2").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("half.bin");
        fs::write(&dest, b"trunc").unwrap();

        let failed: std::io::Result<u64> = Err(std::io::Error::other("disk full"));
        let err = discardPartial(&dest, failed).unwrap_err();
        assert_eq!(err.kind(), "io");
        assert!(!dest.exists());

        let fine = discardPartial(&dest, fs::write(&dest, b"whole")).map(|_| ());
        assert!(fine.is_ok());
        assert_eq!(fs::read(&dest).unwrap(), b"whole");
    }

    #[test]
    fn test_unreadable_link_marker_is_skipped() {
        let (_dir, storage, _outside) = setup();
        savePastedAttachment(&storage, "t7", "ok.txt", &STANDARD.encode(b"ok")).unwrap();
        fs::write(storage.attachmentsDir().join("t7").join("broken.pdf.link"), [0xffu8, 0xfe, 0x00]).unwrap();

        let listed = listAttachments(&storage, "t7");
        let names: Vec<&str> = listed.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["ok.txt"]);
    }

    #[test]
    fn test_pasted_attachment() {
        let (_dir, storage, _outside) = setup();
        let payload = format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG fake"));

        let first = savePastedAttachment(&storage, "t3", "paste.png", &payload).unwrap();
        let second = savePastedAttachment(&storage, "t3", "paste.png", &STANDARD.encode(b"raw")).unwrap();
        assert_eq!(first.name, "paste.png");
        assert_eq!(second.name, "paste_1.png");
        assert_eq!(fs::read(storage.attachmentsDir().join("t3/paste.png")).unwrap(), b"\x89PNG fake");
        assert_eq!(fs::read(storage.attachmentsDir().join("t3/paste_1.png")).unwrap(), b"raw");

        let err = savePastedAttachment(&storage, "t3", "bad.png", "data:image/png;base64,@@@").unwrap_err();
        assert_eq!(err.kind(), "malformedInput");
    }

    #[test]
    fn test_list_and_delete() {
        let (_dir, storage, _outside) = setup();
        assert!(listAttachments(&storage, "none").is_empty());

        savePastedAttachment(&storage, "t4", "b.txt", &STANDARD.encode(b"bb")).unwrap();
        savePastedAttachment(&storage, "t4", "a.txt", &STANDARD.encode(b"a")).unwrap();
        let listed = listAttachments(&storage, "t4");
        let names: Vec<&str> = listed.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(listed[1].size, 2);
        assert!(!listed[0].linked);

        assert_eq!(deleteAttachment(&storage, "t4", "zzz.txt").unwrap_err().kind(), "notFound");
        deleteAttachment(&storage, "t4", "a.txt").unwrap();
        assert!(storage.attachmentsDir().join("t4").exists());
        deleteAttachment(&storage, "t4", "b.txt").unwrap();
        assert!(!storage.attachmentsDir().join("t4").exists());
    }

    #[test]
    fn test_delete_task_attachments_idempotent() {
        let (_dir, storage, _outside) = setup();
        savePastedAttachment(&storage, "t5", "x.bin", &STANDARD.encode(b"x")).unwrap();
        deleteTaskAttachments(&storage, "t5").unwrap();
        assert!(!storage.attachmentsDir().join("t5").exists());
        deleteTaskAttachments(&storage, "t5").unwrap();
    }

    #[test]
    fn test_rejects_path_traversal() {
        let (_dir, storage, _outside) = setup();
        let encoded = STANDARD.encode(b"x");
        assert_eq!(savePastedAttachment(&storage, "..", "x.txt", &encoded).unwrap_err().kind(), "malformedInput");
        assert_eq!(savePastedAttachment(&storage, "t6", "../x.txt", &encoded).unwrap_err().kind(), "malformedInput");
        assert_eq!(getAttachment(&storage, "t6", "../../settings.json").unwrap_err().kind(), "malformedInput");
        assert!(deleteTaskAttachments(&storage, "../data").is_err());
    }
}
