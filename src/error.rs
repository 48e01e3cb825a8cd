// Error types for the board backend
// Every command returns these; the RPC layer turns them into { success: false, kind, error }

/// Failure of a store operation.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing document, backup, attachment or source file.
    #[error("{0}")]
    NotFound(String),

    /// Attachment exceeds the ingestion ceiling.
    #[error("{0}")]
    TooLarge(String),

    /// Unparseable JSON or archive, bad names, unknown methods.
    #[error("{0}")]
    MalformedInput(String),

    /// Disk write/copy/delete failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No dialog host attached.
    #[error("{0}")]
    Unavailable(String),

    /// The user dismissed a dialog.
    #[error("Cancelled")]
    Cancelled,
}

impl AppError {
    /// Stable tag sent to the UI next to the message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "notFound",
            Self::TooLarge(_) => "tooLarge",
            Self::MalformedInput(_) => "malformedInput",
            Self::Io(_) => "io",
            Self::Unavailable(_) => "unavailable",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn notFound(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedInput(format!("Invalid JSON: {}", e))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => Self::Io(io),
            zip::result::ZipError::FileNotFound => Self::NotFound("Archive entry not found".to_string()),
            other => Self::MalformedInput(format!("Invalid archive: {}", other)),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
