// Task model
// The task schema belongs to the UI; the backend only reads a few fields

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status value the UI gives finished tasks
pub const DONE_STATUS: &str = "done";

/// One task as stored in the document, kept verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Task(pub Map<String, Value>);

impl Task {
    /// Task identifier as used for the attachment directory name.
    /// The UI may store it as a string or a number.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Get the title, "Untitled" when missing
    pub fn title(&self) -> &str {
        self.str("title").unwrap_or("Untitled")
    }

    pub fn status(&self) -> Option<&str> {
        self.str("status")
    }

    /// Target date as a zero-padded ISO date (YYYY-MM-DD)
    pub fn targetDate(&self) -> Option<&str> {
        self.str("targetDate").filter(|d| !d.is_empty())
    }

    pub fn isDone(&self) -> bool {
        self.status() == Some(DONE_STATUS)
    }

    fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}
