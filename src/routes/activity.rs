use axum::extract::{Query, State};
use axum::Json;

use crate::app::AppState;
use crate::authz::{require_admin, Identity};
use crate::db::activity;
use crate::errors::AppResult;
use crate::models::activity::{ActivityLog, ActivityLogQuery};

#[utoipa::path(
    get,
    path = "/activity-logs",
    tag = "Activity",
    params(ActivityLogQuery),
    responses(
        (status = 200, description = "Newest entries first", body = [ActivityLog]),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_activity_logs(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ActivityLogQuery>,
) -> AppResult<Json<Vec<ActivityLog>>> {
    require_admin(&identity)?;

    let logs = activity::list(
        &state.pool,
        query.user_id,
        query.resource.as_deref(),
        query.effective_limit(),
    )
    .await?;
    Ok(Json(logs))
}
