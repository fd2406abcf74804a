//! Models for immutable audit events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};

use crate::types::{ActivityLogId, SessionId, UserId};

/// Action kinds persisted by the pipeline. The recording endpoint is
/// deliberately permissive and accepts any non-empty action string;
/// this set is enforced only by filtering and mapping code.
pub const CORE_ACTION_KINDS: [&str; 8] = [
    "login",
    "logout",
    "create_user",
    "update_user",
    "delete_user",
    "session_start",
    "session_end",
    "feature_access",
];

/// Returns `true` for action kinds in the recognized core set.
pub fn is_core_action_kind(kind: &str) -> bool {
    CORE_ACTION_KINDS.contains(&kind)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// One immutable audit event. Never updated or deleted by this pipeline.
pub struct ActivityLog {
    pub id: ActivityLogId,
    /// Acting user, absent for system-originated events.
    pub user_id: Option<UserId>,
    pub action_type: String,
    /// Owning session, if the client supplied one. No cascade.
    pub session_id: Option<SessionId>,
    pub details: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_set_matches_recognized_kinds() {
        for kind in [
            "login",
            "logout",
            "create_user",
            "update_user",
            "delete_user",
            "session_start",
            "session_end",
            "feature_access",
        ] {
            assert!(is_core_action_kind(kind), "{kind} should be core");
        }
        assert!(!is_core_action_kind("password_recovery"));
        assert!(!is_core_action_kind(""));
    }
}
