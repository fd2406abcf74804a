use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{post, put},
    Extension, Router,
};
use chrono::Utc;
use orgdash_backend::{
    handlers::sessions,
    models::user::User,
    models::user::UserRole,
    repositories::session as session_repo,
    state::AppState,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;

mod support;

use support::{seed_user, test_config, test_pool};

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD
        .get_or_init(|| tokio::sync::Mutex::new(()))
        .lock()
        .await
}

fn session_router(pool: PgPool, user: User) -> Router {
    let state = AppState::new(Arc::new(pool), test_config());
    Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/{id}/ping", put(sessions::ping_session))
        .route("/api/sessions/{id}/close", put(sessions::close_session))
        .layer(Extension(user))
        .with_state(state)
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn closing_a_session_deactivates_it_and_stamps_logout_time() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    let user = seed_user(&pool, UserRole::User).await;
    let session = session_repo::create_session(&pool, user.id, None, None, Some("10.0.0.1"))
        .await
        .expect("create session");
    assert!(session.is_active);
    assert!(session.logout_time.is_none());

    let app = session_router(pool.clone(), user.clone());
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/sessions/{}/close", session.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["closed"], true);

    let closed = session_repo::find_session_by_id(&pool, session.id)
        .await
        .expect("fetch session")
        .expect("session exists");
    assert!(!closed.is_active);
    assert!(closed.logout_time.is_some());

    // Closing again is a no-op and leaves the stamped logout time alone.
    let app = session_router(pool.clone(), user);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/sessions/{}/close", session.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["closed"], false);

    let after = session_repo::find_session_by_id(&pool, session.id)
        .await
        .expect("fetch session")
        .expect("session exists");
    assert_eq!(after.logout_time, closed.logout_time);
}

#[tokio::test]
async fn ping_ignores_sessions_owned_by_someone_else() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    let owner = seed_user(&pool, UserRole::User).await;
    let intruder = seed_user(&pool, UserRole::User).await;
    let session = session_repo::create_session(&pool, owner.id, None, None, None)
        .await
        .expect("create session");
    let original_ping = session.last_ping;

    let app = session_router(pool.clone(), intruder);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/sessions/{}/ping", session.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["updated"], false);

    let untouched = session_repo::find_session_by_id(&pool, session.id)
        .await
        .expect("fetch session")
        .expect("session exists");
    assert_eq!(untouched.last_ping, original_ping);
    assert!(untouched.is_active);
}

#[tokio::test]
async fn ping_by_the_owner_advances_the_liveness_marker() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    let owner = seed_user(&pool, UserRole::User).await;
    let session = session_repo::create_session(&pool, owner.id, None, None, None)
        .await
        .expect("create session");

    let before = Utc::now();
    let app = session_router(pool.clone(), owner);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/sessions/{}/ping", session.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["updated"], true);

    let touched = session_repo::find_session_by_id(&pool, session.id)
        .await
        .expect("fetch session")
        .expect("session exists");
    assert!(touched.last_ping.expect("last ping set") >= before);
}
