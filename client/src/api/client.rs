use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::api::types::*;

const AUTH_EVENT_CAPACITY: usize = 16;

/// Authenticated HTTP client for the orgdash API.
///
/// The client owns the access token; components like the session
/// tracker and activity logger share one instance behind an `Arc` and
/// observe sign-in and sign-out through [`ApiClient::subscribe_auth_events`].
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: RwLock<Option<String>>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            auth_events,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Adopts an externally obtained token (e.g. restored from disk)
    /// and announces the sign-in.
    pub async fn adopt_token(&self, token: String, provider: &str) {
        *self.token.write().await = Some(token);
        let _ = self.auth_events.send(AuthEvent::SignedIn {
            provider: provider.to_string(),
        });
    }

    pub fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    async fn bearer(&self) -> Result<String, ApiError> {
        self.token
            .read()
            .await
            .as_deref()
            .map(bearer_value)
            .ok_or(ApiError::NotAuthenticated)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let login: LoginResponse = decode_or_error(response).await?;
        *self.token.write().await = Some(login.access_token.clone());
        let _ = self.auth_events.send(AuthEvent::SignedIn {
            provider: "password".to_string(),
        });
        Ok(login)
    }

    /// Tells the server to record the logout and drops the local token.
    /// The token is cleared even when the request fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let bearer = self.bearer().await?;
        let result = self
            .http
            .post(format!("{}/api/auth/logout", self.base_url))
            .header(header::AUTHORIZATION, bearer)
            .send()
            .await;

        *self.token.write().await = None;
        let _ = self.auth_events.send(AuthEvent::SignedOut);

        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(error_from_response(response).await),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .get(format!("{}/api/auth/me", self.base_url))
            .header(header::AUTHORIZATION, bearer)
            .send()
            .await?;
        decode_or_error(response).await
    }

    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionRecord, ApiError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .post(format!("{}/api/sessions", self.base_url))
            .header(header::AUTHORIZATION, bearer)
            .json(request)
            .send()
            .await?;
        decode_or_error(response).await
    }

    /// Refreshes the session's liveness marker. Returns whether the
    /// server still recognized the session.
    pub async fn ping_session(&self, session_id: &str) -> Result<bool, ApiError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .put(format!("{}/api/sessions/{}/ping", self.base_url, session_id))
            .header(header::AUTHORIZATION, bearer)
            .send()
            .await?;
        let body: Value = decode_or_error(response).await?;
        Ok(body
            .get("updated")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    pub async fn close_session(&self, session_id: &str) -> Result<CloseSessionResponse, ApiError> {
        let token = self.token().await.ok_or(ApiError::NotAuthenticated)?;
        self.close_session_with_token(session_id, &token).await
    }

    /// Variant taking an explicit credential, for callers that
    /// captured a token before the client signed out (the session
    /// tracker closing a session after `SignedOut`).
    pub async fn close_session_with_token(
        &self,
        session_id: &str,
        token: &str,
    ) -> Result<CloseSessionResponse, ApiError> {
        let response = self
            .http
            .put(format!(
                "{}/api/sessions/{}/close",
                self.base_url, session_id
            ))
            .header(header::AUTHORIZATION, bearer_value(token))
            .send()
            .await?;
        decode_or_error(response).await
    }

    /// Submits one audit event. The endpoint answers in a
    /// `{success, data|error}` envelope rather than the plain error
    /// shape used elsewhere.
    pub async fn record_activity(
        &self,
        request: &RecordActivityRequest,
    ) -> Result<Value, ApiError> {
        let token = self.token().await.ok_or(ApiError::NotAuthenticated)?;
        self.record_activity_with_token(request, &token).await
    }

    /// Like [`ApiClient::record_activity`] but with an explicit
    /// credential, so a terminal event (e.g. `session_end`) can still
    /// be recorded after the client's own token is gone.
    pub async fn record_activity_with_token(
        &self,
        request: &RecordActivityRequest,
        token: &str,
    ) -> Result<Value, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/activity/record", self.base_url))
            .header(header::AUTHORIZATION, bearer_value(token))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if body.get("success").and_then(Value::as_bool) == Some(true) {
            return Ok(body.get("data").cloned().unwrap_or(Value::Null));
        }
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("activity recording failed")
            .to_string();
        if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::Unauthorized(message))
        } else {
            Err(ApiError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    pub async fn list_activity_logs(
        &self,
        filters: &LogFilters,
        page: i64,
        per_page: i64,
    ) -> Result<ActivityLogPage, ApiError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .get(format!("{}/api/admin/activity-logs", self.base_url))
            .header(header::AUTHORIZATION, bearer)
            .query(&filters.to_query(page, per_page))
            .send()
            .await?;
        decode_or_error(response).await
    }

    pub async fn list_sessions(
        &self,
        filters: &LogFilters,
        page: i64,
        per_page: i64,
    ) -> Result<SessionPage, ApiError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .get(format!("{}/api/admin/sessions", self.base_url))
            .header(header::AUTHORIZATION, bearer)
            .query(&filters.to_query(page, per_page))
            .send()
            .await?;
        decode_or_error(response).await
    }

    /// Opens the SSE change stream. The caller consumes the raw byte
    /// stream; see [`crate::realtime::ChangeListener`].
    pub async fn open_change_stream(&self) -> Result<Response, ApiError> {
        let bearer = self.bearer().await?;
        let response = self
            .http
            .get(format!("{}/api/admin/logs/stream", self.base_url))
            .header(header::AUTHORIZATION, bearer)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }
}

fn bearer_value(token: &str) -> String {
    format!("Bearer {}", token)
}

async fn decode_or_error<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ApiError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let message = match response.json::<Value>().await {
        Ok(body) => body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => "request failed".to_string(),
    };
    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized(message)
    } else {
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}
