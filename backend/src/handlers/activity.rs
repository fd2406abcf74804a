//! The activity recording endpoint.
//!
//! This is the trusted sink for all client-side telemetry. It performs
//! its own bearer authentication and always re-derives the acting user
//! from the credential; a user id supplied by the client is ignored.
//! Responses use the `{success, data|error}` envelope.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::str::FromStr;

use crate::{
    middleware::auth::authenticate_request,
    repositories::session as session_repo,
    services::{
        activity_log::ActivityEvent,
        change_feed::{ChangeOp, StoreKind},
    },
    state::AppState,
    types::SessionId,
};

/// Sentinel recorded when no proxy header reveals the caller address.
const UNKNOWN_IP: &str = "unknown";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityPayload {
    pub action: Option<String>,
    pub session_id: Option<String>,
    pub details: Option<Value>,
}

type Envelope = (StatusCode, Json<Value>);

fn failure(status: StatusCode, error: impl Into<String>) -> Envelope {
    (status, Json(json!({ "success": false, "error": error.into() })))
}

pub async fn record_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RecordActivityPayload>,
) -> Result<Json<Value>, Envelope> {
    let (_claims, user) = authenticate_request(&headers, &state).await.map_err(|err| {
        failure(
            err.status,
            format!("Unauthorized: {}", err.reason),
        )
    })?;

    // Permissive by design: any non-empty action string is accepted.
    // Strict validation against the core set happens in filtering code.
    let action = match payload.action.as_deref().map(str::trim) {
        Some(action) if !action.is_empty() => action.to_string(),
        _ => return Err(failure(StatusCode::BAD_REQUEST, "`action` is required")),
    };

    let ip_address = extract_ip(&headers).unwrap_or_else(|| UNKNOWN_IP.to_string());
    let now = Utc::now();
    let details = merge_request_details(payload.details, &ip_address, now);

    let session_id = match payload.session_id.as_deref() {
        Some(raw) => match SessionId::from_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(session_id = %raw, "ignoring malformed session id on activity");
                None
            }
        },
        None => None,
    };

    let log = state
        .activity_log
        .record_event(ActivityEvent {
            user_id: Some(user.id),
            action_type: action,
            session_id,
            details: Some(details),
            created_at: now,
        })
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to persist activity entry");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record activity",
            )
        })?;

    // Session bookkeeping is secondary to the audit record: a failed
    // liveness touch is logged and the request still succeeds.
    if let Some(session_id) = session_id {
        match session_repo::touch_session(&state.pool, session_id, user.id, now, Some(&ip_address))
            .await
        {
            Ok(true) => state.change_feed.publish(
                StoreKind::Sessions,
                ChangeOp::Update,
                session_id.to_string(),
            ),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(error = ?err, session_id = %session_id, "session touch failed");
            }
        }
    }

    Ok(Json(json!({ "success": true, "data": log })))
}

/// Enriches the caller's details map with the observed address and the
/// server clock. Caller-supplied values for the same keys win.
fn merge_request_details(details: Option<Value>, ip_address: &str, now: DateTime<Utc>) -> Value {
    let mut map = match details {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
        None => Map::new(),
    };
    map.entry("ip_address".to_string())
        .or_insert_with(|| json!(ip_address));
    map.entry("server_time".to_string())
        .or_insert_with(|| json!(now.to_rfc3339()));
    Value::Object(map)
}

/// Caller address from proxy headers: first hop of `x-forwarded-for`,
/// then `x-real-ip`.
pub(crate) fn extract_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        return value
            .split(',')
            .next()
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn merge_adds_ip_and_server_time() {
        let now = Utc::now();
        let merged = merge_request_details(Some(json!({ "page": "home" })), "1.2.3.4", now);
        assert_eq!(merged["page"], "home");
        assert_eq!(merged["ip_address"], "1.2.3.4");
        assert_eq!(merged["server_time"], now.to_rfc3339());
    }

    #[test]
    fn merge_never_overwrites_caller_ip() {
        let merged = merge_request_details(
            Some(json!({ "ip_address": "9.9.9.9" })),
            "1.2.3.4",
            Utc::now(),
        );
        assert_eq!(merged["ip_address"], "9.9.9.9");
    }

    #[test]
    fn merge_wraps_non_object_details() {
        let merged = merge_request_details(Some(json!("raw string")), "1.2.3.4", Utc::now());
        assert_eq!(merged["value"], "raw string");
        assert_eq!(merged["ip_address"], "1.2.3.4");
    }

    #[test]
    fn merge_handles_absent_details() {
        let merged = merge_request_details(None, "unknown", Utc::now());
        assert_eq!(merged["ip_address"], "unknown");
        assert!(merged.get("server_time").is_some());
    }

    #[test]
    fn extract_ip_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 10.0.0.2"),
        );
        assert_eq!(extract_ip(&headers).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn extract_ip_falls_back_to_real_ip_then_none() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.3"));
        assert_eq!(extract_ip(&headers).as_deref(), Some("10.0.0.3"));

        let empty = HeaderMap::new();
        assert_eq!(extract_ip(&empty), None);
    }
}
