use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    handlers::activity::extract_ip,
    models::user::{LoginRequest, LoginResponse, User, UserResponse},
    repositories::user as user_repo,
    services::activity_log::ActivityEvent,
    state::AppState,
    utils::{jwt::create_access_token, password::verify_password},
};

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = user_repo::find_user_by_email(&state.pool, &payload.email)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    if user.disabled {
        return Err(AppError::Unauthorized("Account is disabled".into()));
    }

    let valid = verify_password(&payload.password, &user.password_hash)
        .map_err(AppError::InternalServerError)?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let access_token = create_access_token(
        user.id.to_string(),
        user.email.clone(),
        user.role.as_str().to_string(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )
    .map_err(AppError::InternalServerError)?;

    state.activity_log.record_event_background(ActivityEvent {
        user_id: Some(user.id),
        action_type: "login".to_string(),
        session_id: None,
        details: Some(login_details(&headers)),
        created_at: Utc::now(),
    });

    Ok(Json(LoginResponse {
        access_token,
        user: UserResponse::from(user),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
) -> Json<Value> {
    state.activity_log.record_event_background(ActivityEvent {
        user_id: Some(user.id),
        action_type: "logout".to_string(),
        session_id: None,
        details: Some(login_details(&headers)),
        created_at: Utc::now(),
    });

    Json(json!({ "message": "Logged out" }))
}

pub async fn me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

fn login_details(headers: &HeaderMap) -> Value {
    json!({
        "method": "password",
        "ip_address": extract_ip(headers).unwrap_or_else(|| "unknown".to_string()),
    })
}
