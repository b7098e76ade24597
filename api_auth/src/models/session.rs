use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Session as reported by the auth service's `get-session` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub session: SessionInfo,
    pub user: SessionUser,
}

impl AuthSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.session
            .expires_at
            .is_some_and(|expires_at| expires_at <= now)
    }

    pub fn display_name(&self) -> &str {
        self.user.name.as_deref().unwrap_or_default()
    }
}
