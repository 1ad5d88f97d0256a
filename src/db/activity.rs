use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::activity::{ActivityLog, DbActivityLog};

const ACTIVITY_SELECT: &str = "SELECT l.id, l.user_id, u.name AS user_name, u.email AS user_email, l.action, l.resource, l.resource_id, l.details, l.timestamp FROM activity_logs l LEFT JOIN users u ON u.id = l.user_id";

/// Newest-first page of the audit trail.
pub async fn list(
    pool: &SqlitePool,
    user_id: Option<Uuid>,
    resource: Option<&str>,
    limit: i64,
) -> AppResult<Vec<ActivityLog>> {
    let mut builder = QueryBuilder::<Sqlite>::new(ACTIVITY_SELECT);
    builder.push(" WHERE 1 = 1");
    if let Some(user_id) = user_id {
        builder.push(" AND l.user_id = ").push_bind(user_id.to_string());
    }
    if let Some(resource) = resource {
        builder.push(" AND l.resource = ").push_bind(resource.to_string());
    }
    builder
        .push(" ORDER BY l.timestamp DESC, l.rowid DESC LIMIT ")
        .push_bind(limit);

    let rows = builder.build_query_as::<DbActivityLog>().fetch_all(pool).await?;
    rows.into_iter().map(ActivityLog::try_from).collect()
}
