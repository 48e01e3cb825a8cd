// Common helpers for commands
// All using camelCase for direct JSON compatibility

use chrono::{DateTime, Local};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Local time as an RFC 3339 string
pub fn nowIso() -> String {
    Local::now().to_rfc3339()
}

/// Timestamp used in backup file names (YYYYMMDD_HHMMSS)
pub fn fileTimestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Milliseconds since the epoch, 0 for times before it
pub fn toMillis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn isImage(path: &Path) -> bool {
    IMAGE_EXTENSIONS.contains(&extension(path).as_str())
}

/// MIME type from the file extension
pub fn mimeType(path: &Path) -> &'static str {
    match extension(path).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mime_table() {
        assert_eq!(mimeType(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mimeType(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mimeType(Path::new("a.png")), "image/png");
        assert_eq!(mimeType(Path::new("a.gif")), "image/gif");
        assert_eq!(mimeType(Path::new("a.bmp")), "image/bmp");
        assert_eq!(mimeType(Path::new("a.webp")), "image/webp");
        assert_eq!(mimeType(Path::new("a.pdf")), "application/pdf");
        assert_eq!(mimeType(Path::new("a.txt")), "text/plain");
        assert_eq!(mimeType(Path::new("a.docx")), "application/octet-stream");
        assert_eq!(mimeType(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn test_is_image() {
        assert!(isImage(Path::new("shot.PNG")));
        assert!(isImage(Path::new("x.webp")));
        assert!(!isImage(Path::new("x.pdf")));
        assert!(!isImage(Path::new("png")));
    }

    #[test]
    fn test_file_timestamp() {
        let at = Local.with_ymd_and_hms(2025, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(fileTimestamp(at), "20250307_090501");
    }
}
