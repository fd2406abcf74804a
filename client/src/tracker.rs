//! Presence session lifecycle.
//!
//! One tracker instance follows one signed-in user: `start_tracking`
//! opens a session and spawns a keep-alive task, `stop_tracking`
//! closes it. Both are idempotent, and the whole lifecycle can be
//! bound to the client's auth events so sessions open and close with
//! sign-in and sign-out.

use std::env::consts::{ARCH, OS};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::{
    api::{ApiClient, AuthEvent, CreateSessionRequest, RecordActivityRequest, SessionRecord},
    geo,
    logger::ActivityLogger,
};

pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5 * 60);

struct TrackerInner {
    current: Option<SessionRecord>,
    // Token snapshot taken when the session opened. Sign-out clears
    // the client's token before the tracker reacts, so the closing
    // requests must use this copy instead.
    token: Option<String>,
    keepalive: Option<JoinHandle<()>>,
}

pub struct SessionTracker {
    api: Arc<ApiClient>,
    logger: ActivityLogger,
    ping_interval: Duration,
    geo_endpoint: Option<String>,
    // Held across session creation so concurrent start calls cannot
    // open two sessions.
    inner: Mutex<TrackerInner>,
}

impl SessionTracker {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let logger = ActivityLogger::new(api.clone());
        Self {
            api,
            logger,
            ping_interval: DEFAULT_PING_INTERVAL,
            geo_endpoint: Some(geo::DEFAULT_GEO_ENDPOINT.to_string()),
            inner: Mutex::new(TrackerInner {
                current: None,
                token: None,
                keepalive: None,
            }),
        }
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Overrides or disables the geolocation lookup.
    pub fn with_geo_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.geo_endpoint = endpoint;
        self
    }

    pub async fn is_tracking(&self) -> bool {
        self.inner.lock().await.current.is_some()
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .current
            .as_ref()
            .map(|session| session.id.clone())
    }

    /// Opens a session unless one is already being tracked, in which
    /// case the existing session is returned untouched. A no-op while
    /// signed out. Returns `None` when session creation fails; tracking
    /// state is left clear so a later call can retry.
    pub async fn start_tracking(
        self: &Arc<Self>,
        extra_metadata: Option<Value>,
    ) -> Option<SessionRecord> {
        let mut inner = self.inner.lock().await;
        if let Some(session) = &inner.current {
            return Some(session.clone());
        }
        let Some(token) = self.api.token().await else {
            tracing::debug!("ignoring start_tracking while signed out");
            return None;
        };

        let location = match &self.geo_endpoint {
            Some(endpoint) => geo::resolve_location(self.api.http(), endpoint).await,
            None => None,
        };
        let request = CreateSessionRequest {
            metadata: Some(build_metadata(extra_metadata)),
            location,
            ip_address: None,
        };

        let session = match self.api.create_session(&request).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "failed to open presence session");
                return None;
            }
        };

        self.logger.log_activity_background(
            "session_start",
            Some(session.id.clone()),
            Some(json!({ "login_time": session.login_time })),
        );

        inner.keepalive = Some(self.spawn_keepalive(session.id.clone()));
        inner.current = Some(session.clone());
        inner.token = Some(token);
        Some(session)
    }

    /// Closes the tracked session, recording a `session_end` event
    /// first. Works after sign-out via the token snapshot taken at
    /// start. A no-op when nothing is tracked.
    pub async fn stop_tracking(&self) {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.current.take() else {
            return;
        };
        let token = inner.token.take();
        if let Some(handle) = inner.keepalive.take() {
            handle.abort();
        }

        let Some(token) = token else {
            return;
        };
        let request = RecordActivityRequest {
            action: "session_end".to_string(),
            session_id: Some(session.id.clone()),
            details: None,
        };
        if let Err(err) = self.api.record_activity_with_token(&request, &token).await {
            tracing::warn!(error = %err, session_id = %session.id, "failed to record session end");
        }

        if let Err(err) = self.api.close_session_with_token(&session.id, &token).await {
            tracing::warn!(error = %err, session_id = %session.id, "failed to close session");
        }
    }

    /// Follows the client's auth lifecycle: sign-in starts tracking,
    /// sign-out stops it. Runs until the client is dropped.
    pub fn bind_auth_events(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = self.clone();
        let mut events = self.api.subscribe_auth_events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedIn { provider }) => {
                        tracker
                            .start_tracking(Some(json!({ "auth_provider": provider })))
                            .await;
                    }
                    Ok(AuthEvent::SignedOut) => {
                        tracker.stop_tracking().await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth event stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn spawn_keepalive(self: &Arc<Self>, session_id: String) -> JoinHandle<()> {
        let api = self.api.clone();
        let interval = self.ping_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; the session was just
            // created, so skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match api.ping_session(&session_id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(session_id = %session_id, "keep-alive no longer matches a session");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, session_id = %session_id, "keep-alive ping failed");
                    }
                }
            }
        })
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.try_lock() {
            if let Some(handle) = &inner.keepalive {
                handle.abort();
            }
        }
    }
}

/// Base client descriptors merged with whatever the caller supplied.
/// Caller-supplied keys win.
fn build_metadata(extra: Option<Value>) -> Value {
    let mut map = Map::new();
    map.insert("os".to_string(), json!(OS));
    map.insert("arch".to_string(), json!(ARCH));
    if let Some(Value::Object(extra)) = extra {
        for (key, value) in extra {
            map.insert(key, value);
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_includes_platform_and_merges_extras() {
        let merged = build_metadata(Some(json!({ "locale": "en-US", "os": "custom" })));
        assert_eq!(merged["locale"], "en-US");
        assert_eq!(merged["arch"], ARCH);
        // caller override wins
        assert_eq!(merged["os"], "custom");
    }

    #[test]
    fn metadata_without_extras_still_has_platform() {
        let merged = build_metadata(None);
        assert_eq!(merged["os"], OS);
        assert_eq!(merged["arch"], ARCH);
    }
}
