use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orgdash_backend::config::Config;
use orgdash_backend::db::connection::{create_pool, DbPool};
use orgdash_backend::models::user::{User, UserRole};
use orgdash_backend::state::AppState;
use orgdash_backend::{handlers, middleware, repositories, utils};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

/// Seeds the first super admin account when the user table is empty and
/// bootstrap credentials are configured. A no-op otherwise.
async fn bootstrap_initial_admin(pool: &DbPool, config: &Config) -> anyhow::Result<()> {
    if repositories::user::count_users(pool).await? > 0 {
        return Ok(());
    }
    let (email, password) = match (
        config.initial_admin_email.as_deref(),
        config.initial_admin_password.as_deref(),
    ) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            tracing::warn!("user table is empty and no bootstrap admin credentials are set");
            return Ok(());
        }
    };

    let password_hash = utils::password::hash_password(password)
        .map_err(|e| anyhow::anyhow!("failed to hash bootstrap password: {e}"))?;
    let admin = User::new(email.to_string(), password_hash, UserRole::SuperAdmin);
    repositories::user::insert_user(pool, &admin).await?;
    tracing::info!(email = %email, "created bootstrap super admin account");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orgdash_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        jwt_secret = %mask_secret(&config.jwt_secret),
        jwt_expiration_hours = config.jwt_expiration_hours,
        session_stale_minutes = config.session_stale_minutes,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(pool.as_ref()).await?;
    bootstrap_initial_admin(&pool, &config).await?;

    let state = AppState::new(pool, config);

    // Public routes. The activity recorder authenticates on its own and
    // answers in the `{success, data|error}` envelope, so it is mounted
    // outside the auth middleware.
    let public_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/activity/record", post(handlers::activity::record_activity));

    // User-protected routes (auth required)
    let user_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/sessions", post(handlers::sessions::create_session))
        .route(
            "/api/sessions/{id}/ping",
            put(handlers::sessions::ping_session),
        )
        .route(
            "/api/sessions/{id}/close",
            put(handlers::sessions::close_session),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ));

    // Admin-protected routes (auth + admin role)
    let admin_routes = Router::new()
        .route(
            "/api/admin/activity-logs",
            get(handlers::admin::activity_logs::list_activity_logs),
        )
        .route(
            "/api/admin/sessions",
            get(handlers::admin::sessions::list_sessions),
        )
        .route(
            "/api/admin/logs/stream",
            get(handlers::admin::stream::change_stream),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_admin,
        ));

    // Super-admin routes (account management)
    let super_admin_routes = Router::new()
        .route("/api/admin/users", post(handlers::admin::users::manage_users))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_super_admin,
        ));

    // Compose app with shared layers (CORS/Trace) and shared state
    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .merge(super_admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
