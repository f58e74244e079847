//! Software tools: teacher-authored HTML snippets run against a class roster.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ValidationError, require};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareTool {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub content_html: String,
}

impl SoftwareTool {
    /// A new tool. The id is a placeholder until storage assigns one.
    pub fn new(name: &str, icon: &str, content_html: String) -> Result<Self, ValidationError> {
        require(name, "tool name")?;
        Ok(Self {
            id: Uuid::nil(),
            name: name.trim().to_string(),
            icon: if icon.trim().is_empty() {
                "💻".to_string()
            } else {
                icon.trim().to_string()
            },
            content_html,
        })
    }
}
