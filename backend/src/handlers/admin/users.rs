//! Single-endpoint account management dispatcher.
//!
//! All account operations arrive as a POST whose body carries an
//! `action` discriminator. The route itself is gated to super admins
//! by middleware; handlers here only implement per-action rules.

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{User, UserResponse, UserRole},
    repositories::user as user_repo,
    services::activity_log::ActivityEvent,
    state::AppState,
    types::UserId,
    utils::password::hash_password,
};

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ManageUsersRequest {
    Create(CreateUserInput),
    Update(UpdateUserInput),
    List,
    Delete { user_id: String },
    UpdateStatus { user_id: String, disabled: bool },
    ResetPassword { user_id: String, password: String },
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    pub user_id: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

pub async fn manage_users(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(request): Json<ManageUsersRequest>,
) -> Result<Json<Value>, AppError> {
    match request {
        ManageUsersRequest::Create(input) => create_user(&state, &actor, input).await,
        ManageUsersRequest::Update(input) => update_user(&state, &actor, input).await,
        ManageUsersRequest::List => list_users(&state).await,
        ManageUsersRequest::Delete { user_id } => delete_user(&state, &actor, &user_id).await,
        ManageUsersRequest::UpdateStatus { user_id, disabled } => {
            update_status(&state, &actor, &user_id, disabled).await
        }
        ManageUsersRequest::ResetPassword { user_id, password } => {
            reset_password(&state, &actor, &user_id, &password).await
        }
    }
}

async fn create_user(
    state: &AppState,
    actor: &User,
    input: CreateUserInput,
) -> Result<Json<Value>, AppError> {
    input.validate()?;

    if user_repo::find_user_by_email(&state.pool, &input.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?;
    let user = User::new(input.email, password_hash, input.role);
    user_repo::insert_user(&state.pool, &user).await?;

    record_admin_action(
        state,
        actor,
        "create_user",
        json!({ "target_user_id": user.id.to_string(), "role": user.role.as_str() }),
    );

    let body = serde_json::to_value(UserResponse::from(user))
        .map_err(|e| AppError::InternalServerError(e.into()))?;
    Ok(Json(body))
}

async fn update_user(
    state: &AppState,
    actor: &User,
    input: UpdateUserInput,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_user_id(&input.user_id)?;

    let password_hash = match input.password.as_deref() {
        Some(password) => {
            if password.len() < 8 {
                return Err(AppError::Validation(vec!["password: length".into()]));
            }
            Some(
                hash_password(password)
                    .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?,
            )
        }
        None => None,
    };

    let updated = user_repo::update_user(
        &state.pool,
        user_id,
        input.email.as_deref(),
        password_hash.as_deref(),
        input.role,
    )
    .await?;
    if !updated {
        return Err(AppError::NotFound("User not found".into()));
    }

    record_admin_action(
        state,
        actor,
        "update_user",
        json!({ "target_user_id": user_id.to_string() }),
    );

    Ok(Json(json!({ "success": true })))
}

async fn list_users(state: &AppState) -> Result<Json<Value>, AppError> {
    let users = user_repo::list_users(&state.pool).await?;
    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(json!({ "users": users })))
}

async fn delete_user(state: &AppState, actor: &User, raw_id: &str) -> Result<Json<Value>, AppError> {
    let user_id = parse_user_id(raw_id)?;
    if user_id == actor.id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".into(),
        ));
    }

    let deleted = user_repo::delete_user(&state.pool, user_id).await?;
    if !deleted {
        return Err(AppError::NotFound("User not found".into()));
    }

    record_admin_action(
        state,
        actor,
        "delete_user",
        json!({ "target_user_id": user_id.to_string() }),
    );

    Ok(Json(json!({ "success": true })))
}

async fn update_status(
    state: &AppState,
    actor: &User,
    raw_id: &str,
    disabled: bool,
) -> Result<Json<Value>, AppError> {
    let user_id = parse_user_id(raw_id)?;
    if user_id == actor.id && disabled {
        return Err(AppError::BadRequest(
            "Cannot disable your own account".into(),
        ));
    }

    let updated = user_repo::set_user_disabled(&state.pool, user_id, disabled).await?;
    if !updated {
        return Err(AppError::NotFound("User not found".into()));
    }

    record_admin_action(
        state,
        actor,
        "update_user",
        json!({ "target_user_id": user_id.to_string(), "disabled": disabled }),
    );

    Ok(Json(json!({ "success": true })))
}

async fn reset_password(
    state: &AppState,
    actor: &User,
    raw_id: &str,
    password: &str,
) -> Result<Json<Value>, AppError> {
    if password.len() < 8 {
        return Err(AppError::Validation(vec!["password: length".into()]));
    }
    let user_id = parse_user_id(raw_id)?;

    let password_hash =
        hash_password(password).map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?;
    let updated = user_repo::update_password(&state.pool, user_id, &password_hash).await?;
    if !updated {
        return Err(AppError::NotFound("User not found".into()));
    }

    record_admin_action(
        state,
        actor,
        "update_user",
        json!({ "target_user_id": user_id.to_string(), "password_reset": true }),
    );

    Ok(Json(json!({ "success": true })))
}

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    UserId::from_str(raw).map_err(|_| AppError::BadRequest("Invalid user ID".into()))
}

fn record_admin_action(state: &AppState, actor: &User, action: &str, details: Value) {
    state.activity_log.record_event_background(ActivityEvent {
        user_id: Some(actor.id),
        action_type: action.to_string(),
        session_id: None,
        details: Some(details),
        created_at: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_tagged_actions() {
        let req: ManageUsersRequest = serde_json::from_value(json!({
            "action": "create",
            "email": "new@example.com",
            "password": "hunter2hunter2",
            "role": "admin"
        }))
        .unwrap();
        match req {
            ManageUsersRequest::Create(input) => {
                assert_eq!(input.email, "new@example.com");
                assert!(matches!(input.role, UserRole::Admin));
            }
            other => panic!("unexpected variant: {:?}", other),
        }

        let req: ManageUsersRequest = serde_json::from_value(json!({ "action": "list" })).unwrap();
        assert!(matches!(req, ManageUsersRequest::List));

        let req: ManageUsersRequest = serde_json::from_value(json!({
            "action": "updateStatus",
            "user_id": "abc",
            "disabled": true
        }))
        .unwrap();
        assert!(matches!(
            req,
            ManageUsersRequest::UpdateStatus { disabled: true, .. }
        ));

        let req: ManageUsersRequest = serde_json::from_value(json!({
            "action": "resetPassword",
            "user_id": "abc",
            "password": "newpassword1"
        }))
        .unwrap();
        assert!(matches!(req, ManageUsersRequest::ResetPassword { .. }));
    }

    #[test]
    fn create_defaults_role_to_member() {
        let req: ManageUsersRequest = serde_json::from_value(json!({
            "action": "create",
            "email": "x@example.com",
            "password": "longenough"
        }))
        .unwrap();
        match req {
            ManageUsersRequest::Create(input) => assert!(matches!(input.role, UserRole::User)),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result: Result<ManageUsersRequest, _> =
            serde_json::from_value(json!({ "action": "promote" }));
        assert!(result.is_err());
    }

    #[test]
    fn create_input_validation_catches_bad_fields() {
        let bad_email = CreateUserInput {
            email: "not-an-email".into(),
            password: "longenough".into(),
            role: UserRole::User,
        };
        assert!(bad_email.validate().is_err());

        let short_password = CreateUserInput {
            email: "ok@example.com".into(),
            password: "short".into(),
            role: UserRole::User,
        };
        assert!(short_password.validate().is_err());
    }
}
