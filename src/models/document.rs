// Task document model (data/kanban_data.json)
// Loaded and saved wholesale; only top-level fields are interpreted

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::task::Task;

/// Group every document has
pub const DEFAULT_GROUP: &str = "General";

/// Built-in labels used when a document carries none
pub fn defaultLabels() -> Vec<Value> {
    vec![
        json!({"id": "1", "name": "Bug", "color": "#ef4444"}),
        json!({"id": "2", "name": "Feature", "color": "#3b82f6"}),
        json!({"id": "3", "name": "Urgent", "color": "#f59e0b"}),
        json!({"id": "4", "name": "Review", "color": "#8b5cf6"}),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDocument {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default = "defaultLabels")]
    pub labels: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastModified: Option<String>,
    /// Fields the backend does not know about (also bundle metadata)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TaskDocument {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            groups: vec![DEFAULT_GROUP.to_string()],
            labels: defaultLabels(),
            lastModified: None,
            extra: Map::new(),
        }
    }
}

impl TaskDocument {
    /// Parse a document and apply group defaulting
    pub fn fromJson(text: &str) -> Result<Self, serde_json::Error> {
        let mut document: Self = serde_json::from_str(text)?;
        document.normalize();
        Ok(document)
    }

    /// A document always has at least the default group
    pub fn normalize(&mut self) {
        if self.groups.is_empty() {
            self.groups.push(DEFAULT_GROUP.to_string());
        }
    }
}
