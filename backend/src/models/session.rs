//! Models for tracking user presence sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};

use crate::types::{SessionId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of one continuous period of user presence.
///
/// Invariant: `is_active == true` exactly when `logout_time` is unset.
pub struct Session {
    /// Unique identifier for the session record.
    pub id: SessionId,
    /// User the session belongs to.
    pub user_id: UserId,
    /// Timestamp when tracking started. Immutable after creation.
    pub login_time: DateTime<Utc>,
    /// Timestamp when the session was closed, absent while active.
    pub logout_time: Option<DateTime<Utc>>,
    /// Timestamp of the most recent keep-alive or logged activity.
    pub last_ping: Option<DateTime<Utc>>,
    /// Whether the session is still open.
    pub is_active: bool,
    /// Free-form client descriptors (device, browser, locale, screen size).
    pub metadata: Option<Json<Value>>,
    /// Best-effort geolocation resolved at creation (city/region/country).
    pub location: Option<Json<Value>>,
    /// Network address observed at creation or on the latest activity.
    pub ip_address: Option<String>,
}

impl Session {
    /// An active session whose keep-alive has been silent longer than the
    /// threshold. Sessions are never expired automatically; staleness is
    /// interpreted at read time.
    pub fn is_stale(&self, threshold_minutes: i64, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        let reference = self.last_ping.unwrap_or(self.login_time);
        now - reference > Duration::minutes(threshold_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(last_ping_minutes_ago: Option<i64>, is_active: bool) -> Session {
        let now = Utc::now();
        Session {
            id: SessionId::new(),
            user_id: UserId::new(),
            login_time: now - Duration::hours(1),
            logout_time: if is_active { None } else { Some(now) },
            last_ping: last_ping_minutes_ago.map(|m| now - Duration::minutes(m)),
            is_active,
            metadata: None,
            location: None,
            ip_address: None,
        }
    }

    #[test]
    fn stale_when_ping_older_than_threshold() {
        let now = Utc::now();
        assert!(session(Some(20), true).is_stale(15, now));
        assert!(!session(Some(5), true).is_stale(15, now));
    }

    #[test]
    fn closed_sessions_are_never_stale() {
        let now = Utc::now();
        assert!(!session(Some(60), false).is_stale(15, now));
    }

    #[test]
    fn falls_back_to_login_time_without_pings() {
        let now = Utc::now();
        // login_time is one hour ago in the fixture
        assert!(session(None, true).is_stale(15, now));
    }
}
