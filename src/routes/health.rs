use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_ok: bool,
    pub db_error: Option<String>,
}

/// Always answers 200; a failing database shows up in `db_ok`.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    security(()),
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_check = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await;

    match db_check {
        Ok(_) => Json(HealthResponse {
            status: "ok",
            db_ok: true,
            db_error: None,
        }),
        Err(err) => {
            tracing::warn!(error = %err, "health check database ping failed");
            Json(HealthResponse {
                status: "ok",
                db_ok: false,
                db_error: Some(err.to_string()),
            })
        }
    }
}
