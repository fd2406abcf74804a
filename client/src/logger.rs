//! Best-effort activity logging.
//!
//! Logging must never interfere with the feature that triggered it:
//! events recorded while signed out are dropped silently, unknown
//! action kinds are dropped, and send failures are only logged.

use std::sync::Arc;

use serde_json::Value;

use crate::api::{ApiClient, RecordActivityRequest};

/// The action kinds the dashboard understands. Everything the logger
/// sends is one of these.
const CORE_ACTION_KINDS: [&str; 8] = [
    "login",
    "logout",
    "create_user",
    "update_user",
    "delete_user",
    "session_start",
    "session_end",
    "feature_access",
];

/// Maps an event name to a core action kind. Names already in the core
/// set pass through; a few well-known aliases are folded into their
/// nearest kind; anything else yields `None`.
pub fn normalize_action_kind(event: &str) -> Option<&'static str> {
    let event = event.trim();
    if let Some(kind) = CORE_ACTION_KINDS.iter().find(|kind| **kind == event) {
        return Some(kind);
    }
    match event {
        "user_created" => Some("create_user"),
        "user_updated" => Some("update_user"),
        "user_deleted" => Some("delete_user"),
        "password_recovery" | "token_refresh" => Some("login"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct ActivityLogger {
    api: Arc<ApiClient>,
}

impl ActivityLogger {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Records one event and waits for the result. Unknown kinds and
    /// signed-out states are silent no-ops; a failed send is reported
    /// through tracing only.
    pub async fn log_activity(
        &self,
        event: &str,
        session_id: Option<&str>,
        details: Option<Value>,
    ) {
        let Some(action) = normalize_action_kind(event) else {
            tracing::debug!(event = %event, "dropping activity with unmapped action kind");
            return;
        };
        if self.api.token().await.is_none() {
            return;
        }

        let request = RecordActivityRequest {
            action: action.to_string(),
            session_id: session_id.map(|id| id.to_string()),
            details,
        };
        if let Err(err) = self.api.record_activity(&request).await {
            tracing::warn!(error = %err, action = %action, "failed to record activity");
        }
    }

    /// Fire-and-forget variant for call sites that must not await.
    pub fn log_activity_background(
        &self,
        event: &str,
        session_id: Option<String>,
        details: Option<Value>,
    ) {
        let logger = self.clone();
        let event = event.to_string();
        tokio::spawn(async move {
            logger
                .log_activity(&event, session_id.as_deref(), details)
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_kinds_pass_through() {
        for kind in CORE_ACTION_KINDS {
            assert_eq!(normalize_action_kind(kind), Some(kind));
        }
    }

    #[test]
    fn aliases_fold_into_core_kinds() {
        assert_eq!(normalize_action_kind("user_created"), Some("create_user"));
        assert_eq!(normalize_action_kind("user_updated"), Some("update_user"));
        assert_eq!(normalize_action_kind("user_deleted"), Some("delete_user"));
        assert_eq!(normalize_action_kind("password_recovery"), Some("login"));
        assert_eq!(normalize_action_kind("token_refresh"), Some("login"));
    }

    #[test]
    fn unknown_events_are_dropped() {
        assert_eq!(normalize_action_kind("page_view"), None);
        assert_eq!(normalize_action_kind(""), None);
    }
}
