use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::AppError,
    handlers::admin::common::{
        clamp_pagination, ensure_range, normalize_filter, parse_from_datetime, parse_to_datetime,
    },
    models::activity_log::{is_core_action_kind, ActivityLog},
    repositories::activity_log::{self, ActivityLogFilters},
    state::AppState,
};

/// Display sentinel for entries recorded without an acting user.
const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Deserialize)]
pub struct ActivityLogListQuery {
    pub user_id: Option<String>,
    pub action_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityLogItem {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub action_type: String,
    pub session_id: Option<String>,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ActivityLogListResponse {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub items: Vec<ActivityLogItem>,
}

pub async fn list_activity_logs(
    State(state): State<AppState>,
    Query(q): Query<ActivityLogListQuery>,
) -> Result<Json<ActivityLogListResponse>, AppError> {
    let (page, per_page, filters) = validate_list_query(q)?;
    let offset = (page - 1) * per_page;

    let (items, total) = activity_log::list_activity_logs(&state.pool, &filters, per_page, offset)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    let mut enriched = Vec::with_capacity(items.len());
    for log in items {
        enriched.push(enrich(&state, log).await);
    }

    Ok(Json(ActivityLogListResponse {
        page,
        per_page,
        total,
        items: enriched,
    }))
}

async fn enrich(state: &AppState, log: ActivityLog) -> ActivityLogItem {
    let (user_id, user_email) = match log.user_id {
        Some(id) => (
            id.to_string(),
            state.email_cache.resolve(&state.pool, id).await,
        ),
        None => (SYSTEM_ACTOR.to_string(), SYSTEM_ACTOR.to_string()),
    };
    ActivityLogItem {
        id: log.id.to_string(),
        user_id,
        user_email,
        action_type: log.action_type,
        session_id: log.session_id.map(|id| id.to_string()),
        details: log.details.map(|value| value.0),
        created_at: log.created_at,
    }
}

fn validate_list_query(
    q: ActivityLogListQuery,
) -> Result<(i64, i64, ActivityLogFilters), AppError> {
    let (page, per_page) = clamp_pagination(q.page, q.per_page);

    let from = parse_from_datetime(q.from.as_deref())?;
    let to = parse_to_datetime(q.to.as_deref())?;
    ensure_range(from, to)?;

    // The recording boundary is permissive, but filtering is strict:
    // only the recognized core kinds are accepted here.
    let action_type = normalize_filter(q.action_type).map(|v| v.to_ascii_lowercase());
    if let Some(ref kind) = action_type {
        if !is_core_action_kind(kind) {
            return Err(AppError::BadRequest(format!(
                "`action_type` must be one of the recognized kinds, got `{}`",
                kind
            )));
        }
    }

    Ok((
        page,
        per_page,
        ActivityLogFilters {
            user_id: normalize_filter(q.user_id),
            action_type,
            from,
            to,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(action_type: Option<&str>) -> ActivityLogListQuery {
        ActivityLogListQuery {
            user_id: None,
            action_type: action_type.map(|s| s.to_string()),
            from: None,
            to: None,
            page: None,
            per_page: None,
        }
    }

    #[test]
    fn accepts_core_action_kinds_case_insensitively() {
        let (page, per_page, filters) = validate_list_query(query(Some("LOGIN"))).unwrap();
        assert_eq!((page, per_page), (1, 25));
        assert_eq!(filters.action_type.as_deref(), Some("login"));
    }

    #[test]
    fn rejects_unrecognized_action_kinds() {
        assert!(validate_list_query(query(Some("password_recovery"))).is_err());
        assert!(validate_list_query(query(Some("nonsense"))).is_err());
    }

    #[test]
    fn blank_filters_are_dropped() {
        let (_, _, filters) = validate_list_query(ActivityLogListQuery {
            user_id: Some("   ".into()),
            action_type: Some("".into()),
            from: None,
            to: None,
            page: Some(2),
            per_page: Some(10),
        })
        .unwrap();
        assert!(filters.user_id.is_none());
        assert!(filters.action_type.is_none());
    }

    #[test]
    fn rejects_inverted_date_range() {
        let q = ActivityLogListQuery {
            user_id: None,
            action_type: None,
            from: Some("2026-08-10".into()),
            to: Some("2026-08-01".into()),
            page: None,
            per_page: None,
        };
        assert!(validate_list_query(q).is_err());
    }
}
