use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::activity_log::ActivityLog;

#[derive(Debug, Clone, Default)]
pub struct ActivityLogFilters {
    /// Substring match against the owning user id.
    pub user_id: Option<String>,
    /// Exact match against the action kind.
    pub action_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn insert_activity_log(pool: &PgPool, log: &ActivityLog) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activity_logs (id, user_id, action_type, session_id, details, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(log.id)
    .bind(log.user_id)
    .bind(&log.action_type)
    .bind(log.session_id)
    .bind(&log.details)
    .bind(log.created_at)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Returns one newest-first page plus the total count of all rows
/// matching the same filters.
pub async fn list_activity_logs(
    pool: &PgPool,
    filters: &ActivityLogFilters,
    per_page: i64,
    offset: i64,
) -> Result<(Vec<ActivityLog>, i64), sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, user_id, action_type, session_id, details, created_at FROM activity_logs",
    );
    let mut has_clause = false;
    apply_activity_log_filters(&mut builder, &mut has_clause, filters);
    builder.push(" ORDER BY created_at DESC, id DESC");
    builder
        .push(" LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = builder.build_query_as::<ActivityLog>().fetch_all(pool).await?;

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM activity_logs");
    let mut count_has_clause = false;
    apply_activity_log_filters(&mut count_builder, &mut count_has_clause, filters);
    let total = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    Ok((items, total))
}

fn apply_activity_log_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    has_clause: &mut bool,
    filters: &ActivityLogFilters,
) {
    if let Some(user_id) = filters.user_id.as_ref() {
        push_clause(builder, has_clause);
        builder
            .push("user_id LIKE ")
            .push_bind(format!("%{}%", user_id));
    }
    if let Some(action_type) = filters.action_type.as_ref() {
        push_clause(builder, has_clause);
        builder
            .push("action_type = ")
            .push_bind(action_type.to_string());
    }
    if let Some(from) = filters.from.as_ref() {
        push_clause(builder, has_clause);
        builder.push("created_at >= ").push_bind(from.to_owned());
    }
    if let Some(to) = filters.to.as_ref() {
        push_clause(builder, has_clause);
        builder.push("created_at <= ").push_bind(to.to_owned());
    }
}

pub(crate) fn push_clause(builder: &mut QueryBuilder<'_, Postgres>, has_clause: &mut bool) {
    if *has_clause {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *has_clause = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_log_filters_default_all_none() {
        let filters = ActivityLogFilters::default();
        assert!(filters.user_id.is_none());
        assert!(filters.action_type.is_none());
        assert!(filters.from.is_none());
        assert!(filters.to.is_none());
    }
}
