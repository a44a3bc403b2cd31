use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity record owned by the external provider. Held only as the latest
/// snapshot; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or("User").to_string())
    }

    pub fn initials(&self) -> String {
        // display_name is provider-supplied text, so index by chars, not bytes
        let initials: String = self.name().chars().take(2).collect();
        if initials.is_empty() {
            "U".to_string()
        } else {
            initials.to_uppercase()
        }
    }
}

/// Profile record attached to an identity, best-effort. Absence never blocks
/// an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub plan: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub prompt_credits: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
