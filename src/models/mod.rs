// Models module for the board backend
// All fields use camelCase so they serialize straight to the UI

pub mod attachment;
pub mod backup;
pub mod config;
pub mod document;
pub mod task;

pub use attachment::{AttachmentData, AttachmentInfo};
pub use backup::{BackupInfo, BackupKind};
pub use config::{Settings, WindowState};
pub use document::{TaskDocument, defaultLabels, DEFAULT_GROUP};
pub use task::Task;
