use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};

use crate::models::session::Session;
use crate::repositories::activity_log::push_clause;
use crate::types::{SessionId, UserId};

#[derive(Debug, Clone, Default)]
pub struct SessionFilters {
    /// Substring match against the owning user id.
    pub user_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn create_session(
    pool: &PgPool,
    user_id: UserId,
    metadata: Option<Value>,
    location: Option<Value>,
    ip_address: Option<&str>,
) -> Result<Session, sqlx::Error> {
    let session_id = SessionId::new();
    let now = Utc::now();

    sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO user_sessions
            (id, user_id, login_time, logout_time, last_ping, is_active, metadata, location, ip_address)
        VALUES ($1, $2, $3, NULL, $4, TRUE, $5, $6, $7)
        RETURNING id, user_id, login_time, logout_time, last_ping, is_active, metadata, location, ip_address
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .bind(metadata.map(Json))
    .bind(location.map(Json))
    .bind(ip_address)
    .fetch_one(pool)
    .await
}

pub async fn find_session_by_id(
    pool: &PgPool,
    session_id: SessionId,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, user_id, login_time, logout_time, last_ping, is_active, metadata, location, ip_address
        FROM user_sessions
        WHERE id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await
}

/// Refreshes the liveness marker on the caller's own session. Matching
/// by id and owner makes the update a no-op for foreign or unknown
/// sessions, so it is always safe to call.
pub async fn touch_session(
    pool: &PgPool,
    session_id: SessionId,
    user_id: UserId,
    last_ping: DateTime<Utc>,
    ip_address: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_sessions
        SET last_ping = $1,
            ip_address = COALESCE($2, ip_address)
        WHERE id = $3 AND user_id = $4
        "#,
    )
    .bind(last_ping)
    .bind(ip_address)
    .bind(session_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Flips the session inactive and stamps the logout time. Only touches
/// sessions that are still active, so a repeated close is a no-op.
pub async fn close_session(
    pool: &PgPool,
    session_id: SessionId,
    user_id: UserId,
    logout_time: DateTime<Utc>,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        UPDATE user_sessions
        SET is_active = FALSE, logout_time = $1
        WHERE id = $2 AND user_id = $3 AND is_active = TRUE
        RETURNING id, user_id, login_time, logout_time, last_ping, is_active, metadata, location, ip_address
        "#,
    )
    .bind(logout_time)
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Returns one newest-first page plus the total count of all rows
/// matching the same filters.
pub async fn list_sessions(
    pool: &PgPool,
    filters: &SessionFilters,
    per_page: i64,
    offset: i64,
) -> Result<(Vec<Session>, i64), sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, user_id, login_time, logout_time, last_ping, is_active, metadata, location, \
         ip_address FROM user_sessions",
    );
    let mut has_clause = false;
    apply_session_filters(&mut builder, &mut has_clause, filters);
    builder.push(" ORDER BY login_time DESC, id DESC");
    builder
        .push(" LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = builder.build_query_as::<Session>().fetch_all(pool).await?;

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM user_sessions");
    let mut count_has_clause = false;
    apply_session_filters(&mut count_builder, &mut count_has_clause, filters);
    let total = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    Ok((items, total))
}

fn apply_session_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    has_clause: &mut bool,
    filters: &SessionFilters,
) {
    if let Some(user_id) = filters.user_id.as_ref() {
        push_clause(builder, has_clause);
        builder
            .push("user_id LIKE ")
            .push_bind(format!("%{}%", user_id));
    }
    if let Some(from) = filters.from.as_ref() {
        push_clause(builder, has_clause);
        builder.push("login_time >= ").push_bind(from.to_owned());
    }
    if let Some(to) = filters.to.as_ref() {
        push_clause(builder, has_clause);
        builder.push("login_time <= ").push_bind(to.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_filters_default_all_none() {
        let filters = SessionFilters::default();
        assert!(filters.user_id.is_none());
        assert!(filters.from.is_none());
        assert!(filters.to.is_none());
    }
}
