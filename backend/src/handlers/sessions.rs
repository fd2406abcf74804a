use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;

use crate::{
    error::AppError,
    handlers::activity::extract_ip,
    models::{session::Session, user::User},
    repositories::session as session_repo,
    services::change_feed::{ChangeOp, StoreKind},
    state::AppState,
    types::SessionId,
};

#[derive(Debug, Deserialize)]
pub struct CreateSessionPayload {
    /// Free-form client descriptors (device, browser, locale, screen size).
    #[serde(default)]
    pub metadata: Option<Value>,
    /// Best-effort geolocation the client resolved before the insert.
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<Json<Session>, AppError> {
    let ip_address = payload.ip_address.or_else(|| extract_ip(&headers));
    let session = session_repo::create_session(
        &state.pool,
        user.id,
        payload.metadata,
        payload.location,
        ip_address.as_deref(),
    )
    .await
    .map_err(|e| AppError::InternalServerError(e.into()))?;

    state
        .change_feed
        .publish(StoreKind::Sessions, ChangeOp::Insert, session.id.to_string());

    Ok(Json(session))
}

pub async fn ping_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session_id =
        SessionId::from_str(&id).map_err(|_| AppError::BadRequest("Invalid session ID".into()))?;

    let ip_address = extract_ip(&headers);
    let updated = session_repo::touch_session(
        &state.pool,
        session_id,
        user.id,
        Utc::now(),
        ip_address.as_deref(),
    )
    .await
    .map_err(|e| AppError::InternalServerError(e.into()))?;

    if updated {
        state
            .change_feed
            .publish(StoreKind::Sessions, ChangeOp::Update, id.clone());
    }

    Ok(Json(json!({ "updated": updated })))
}

pub async fn close_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session_id =
        SessionId::from_str(&id).map_err(|_| AppError::BadRequest("Invalid session ID".into()))?;

    let closed = session_repo::close_session(&state.pool, session_id, user.id, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    match closed {
        Some(session) => {
            state
                .change_feed
                .publish(StoreKind::Sessions, ChangeOp::Update, id);
            Ok(Json(json!({ "closed": true, "session": session })))
        }
        // Already closed, or not this caller's session: nothing to do.
        None => Ok(Json(json!({ "closed": false }))),
    }
}
