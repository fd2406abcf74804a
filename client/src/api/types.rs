use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no access token; sign in first")]
    NotAuthenticated,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Auth lifecycle notifications emitted by the client.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn { provider: String },
    SignedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    pub last_ping: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub metadata: Option<Value>,
    pub location: Option<Value>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseSessionResponse {
    pub closed: bool,
    pub session: Option<SessionRecord>,
}

/// Payload for the activity recording endpoint. The wire format uses
/// camelCase keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityRequest {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub action_type: String,
    pub session_id: Option<String>,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityLogPage {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub items: Vec<ActivityLogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionEntry {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    pub last_ping: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_stale: bool,
    pub metadata: Option<Value>,
    pub location: Option<Value>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionPage {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub items: Vec<SessionEntry>,
}

/// Admin log view filters. Dates are passed through verbatim; the
/// server accepts RFC3339 or bare `YYYY-MM-DD` values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilters {
    pub user_id: Option<String>,
    pub action_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl LogFilters {
    pub(crate) fn to_query(&self, page: i64, per_page: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Some(user_id) = &self.user_id {
            params.push(("user_id", user_id.clone()));
        }
        if let Some(action_type) = &self.action_type {
            params.push(("action_type", action_type.clone()));
        }
        if let Some(from) = &self.from {
            params.push(("from", from.clone()));
        }
        if let Some(to) = &self.to {
            params.push(("to", to.clone()));
        }
        params
    }
}

/// One change notification from the realtime feed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChangeNotice {
    pub store: String,
    pub op: String,
    pub id: String,
}
