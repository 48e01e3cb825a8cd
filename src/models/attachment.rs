// Attachment models
// Copied files live in data/attachments/<taskId>/, links are <name>.link markers

use serde::Serialize;

/// Attachment as listed for a task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub isImage: bool,
    pub linked: bool,
    /// Linked targets may have been moved or deleted
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originalPath: Option<String>,
}

/// Attachment content for display, as a data URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentData {
    pub name: String,
    pub data: String,
    pub mimeType: String,
    pub size: u64,
    pub linked: bool,
}
