//! Sports: the top-level grouping for sheets and results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ValidationError, require};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sport {
    pub id: Uuid,
    pub name: String,
    pub icon: String,

    /// Optional HTML guide shown to observers while recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
}

impl Sport {
    /// A new sport. The id is a placeholder until storage assigns one.
    pub fn new(name: &str, icon: &str) -> Result<Self, ValidationError> {
        require(name, "sport name")?;
        require(icon, "sport icon")?;
        Ok(Self {
            id: Uuid::nil(),
            name: name.trim().to_string(),
            icon: icon.trim().to_string(),
            description_html: None,
        })
    }
}

/// The sports a fresh installation starts with.
pub fn default_sports() -> Vec<Sport> {
    const DEFAULTS: [(&str, &str); 9] = [
        ("Athlétisme", "🏃"),
        ("Basket", "🏀"),
        ("Musculation", "🏋️"),
        ("Badminton", "🏸"),
        ("Football", "⚽"),
        ("Handball", "🤾"),
        ("Natation", "🏊"),
        ("Escalade", "🧗"),
        ("Gymnastique", "🤸"),
    ];

    DEFAULTS
        .iter()
        .enumerate()
        .map(|(i, (name, icon))| Sport {
            id: Uuid::nil(),
            name: (*name).to_string(),
            icon: (*icon).to_string(),
            description_html: (i == 0).then(|| {
                "<h1>Vitesse & Endurance</h1><p>Consignes de sécurité...</p>".to_string()
            }),
        })
        .collect()
}
