use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool};

use crate::{
    models::activity_log::ActivityLog,
    repositories::activity_log as activity_log_repo,
    services::change_feed::{ChangeFeed, ChangeOp, StoreKind},
    types::{ActivityLogId, SessionId, UserId},
};

#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub user_id: Option<UserId>,
    pub action_type: String,
    pub session_id: Option<SessionId>,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Persists audit events and notifies log viewers. The insert is the
/// primary obligation; the change notification is best effort.
#[derive(Debug, Clone)]
pub struct ActivityLogService {
    pool: PgPool,
    change_feed: ChangeFeed,
}

impl ActivityLogService {
    pub fn new(pool: PgPool, change_feed: ChangeFeed) -> Self {
        Self { pool, change_feed }
    }

    pub async fn record_event(&self, event: ActivityEvent) -> Result<ActivityLog, sqlx::Error> {
        let log = ActivityLog {
            id: ActivityLogId::new(),
            user_id: event.user_id,
            action_type: event.action_type,
            session_id: event.session_id,
            details: event.details.map(Json),
            created_at: event.created_at,
        };

        activity_log_repo::insert_activity_log(&self.pool, &log).await?;
        self.change_feed
            .publish(StoreKind::Activity, ChangeOp::Insert, log.id.to_string());
        Ok(log)
    }

    /// Fire-and-forget variant used by handlers whose primary work must
    /// not fail on audit bookkeeping.
    pub fn record_event_background(&self, event: ActivityEvent) {
        let service = self.clone();
        let action = event.action_type.clone();
        tokio::spawn(async move {
            if let Err(err) = service.record_event(event).await {
                tracing::warn!(error = ?err, action_type = %action, "Failed to record activity event");
            }
        });
    }
}
