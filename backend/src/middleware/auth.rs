use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::str::FromStr;

use crate::{
    models::user::User, repositories::user as user_repo, state::AppState, types::UserId,
    utils::jwt::{verify_access_token, Claims},
};

pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(request.headers(), &state)
        .await
        .map_err(|err| err.status)?;
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Auth + require admin role for the log viewers
pub async fn auth_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(request.headers(), &state)
        .await
        .map_err(|err| err.status)?;
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Auth + require super admin role for account management
pub async fn auth_super_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(request.headers(), &state)
        .await
        .map_err(|err| err.status)?;
    if !user.is_super_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Authentication failure with both an HTTP status and a human-readable
/// reason, for endpoints that speak the `{success, error}` envelope.
#[derive(Debug)]
pub struct AuthFailure {
    pub status: StatusCode,
    pub reason: &'static str,
}

impl AuthFailure {
    fn unauthorized(reason: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            reason,
        }
    }
}

/// Re-derives the acting user from the bearer credential. Client
/// identity claims are never trusted; the token is verified and the
/// account is re-fetched on every request.
pub async fn authenticate_request(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<(Claims, User), AuthFailure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or_else(|| AuthFailure::unauthorized("missing bearer credential"))?;

    let claims = verify_access_token(token, &state.config.jwt_secret)
        .map_err(|_| AuthFailure::unauthorized("invalid or expired token"))?;

    let user_id = UserId::from_str(&claims.sub)
        .map_err(|_| AuthFailure::unauthorized("malformed subject claim"))?;

    let user = user_repo::find_user_by_id(&state.pool, user_id)
        .await
        .map_err(|_| AuthFailure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            reason: "user lookup failed",
        })?
        .ok_or_else(|| AuthFailure::unauthorized("unknown user"))?;

    if user.disabled {
        return Err(AuthFailure::unauthorized("account disabled"));
    }

    Ok((claims, user))
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_token_accepts_case_variants() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("BEARER abc"), Some("abc"));
    }

    #[test]
    fn parse_bearer_token_rejects_other_schemes() {
        assert_eq!(parse_bearer_token("Basic abc"), None);
        assert_eq!(parse_bearer_token("abc"), None);
        assert_eq!(parse_bearer_token(""), None);
    }
}
