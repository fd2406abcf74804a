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
    models::session::Session,
    repositories::session::{self, SessionFilters},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub user_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionItem {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    pub last_ping: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Active but silent past the configured threshold. Derived at read
    /// time; the stored row is never expired.
    pub is_stale: bool,
    pub metadata: Option<Value>,
    pub location: Option<Value>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub items: Vec<SessionItem>,
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(q): Query<SessionListQuery>,
) -> Result<Json<SessionListResponse>, AppError> {
    let (page, per_page) = clamp_pagination(q.page, q.per_page);
    let from = parse_from_datetime(q.from.as_deref())?;
    let to = parse_to_datetime(q.to.as_deref())?;
    ensure_range(from, to)?;

    let filters = SessionFilters {
        user_id: normalize_filter(q.user_id),
        from,
        to,
    };
    let offset = (page - 1) * per_page;

    let (sessions, total) = session::list_sessions(&state.pool, &filters, per_page, offset)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    let now = Utc::now();
    let stale_after = state.config.session_stale_minutes;
    let mut items = Vec::with_capacity(sessions.len());
    for s in sessions {
        items.push(to_item(&state, s, stale_after, now).await);
    }

    Ok(Json(SessionListResponse {
        page,
        per_page,
        total,
        items,
    }))
}

async fn to_item(
    state: &AppState,
    session: Session,
    stale_after: i64,
    now: DateTime<Utc>,
) -> SessionItem {
    let user_email = state.email_cache.resolve(&state.pool, session.user_id).await;
    SessionItem {
        id: session.id.to_string(),
        user_id: session.user_id.to_string(),
        user_email,
        is_stale: session.is_stale(stale_after, now),
        login_time: session.login_time,
        logout_time: session.logout_time,
        last_ping: session.last_ping,
        is_active: session.is_active,
        metadata: session.metadata.map(|value| value.0),
        location: session.location.map(|value| value.0),
        ip_address: session.ip_address,
    }
}
