use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::parse_uuid;
use crate::errors::AppError;
use crate::models::user::UserSummary;

/// Page size used when the caller does not pass `limit`.
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
pub const MAX_ACTIVITY_LIMIT: i64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Absent when the acting user no longer exists.
    pub user: Option<UserSummary>,
    pub action: String,
    pub resource: String,
    pub resource_id: Uuid,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbActivityLog {
    pub id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub action: String,
    pub resource: String,
    pub resource_id: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<DbActivityLog> for ActivityLog {
    type Error = AppError;

    fn try_from(value: DbActivityLog) -> Result<Self, Self::Error> {
        let user_id = parse_uuid(&value.user_id)?;
        let user = match (value.user_name, value.user_email) {
            (Some(name), Some(email)) => Some(UserSummary { id: user_id, name, email }),
            _ => None,
        };

        Ok(ActivityLog {
            id: parse_uuid(&value.id)?,
            user_id,
            user,
            action: value.action,
            resource: value.resource,
            resource_id: parse_uuid(&value.resource_id)?,
            details: value.details,
            timestamp: value.timestamp,
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityLogQuery {
    pub user_id: Option<Uuid>,
    /// Resource tag as written by the logger, e.g. `project` or `task`.
    #[param(example = "task")]
    pub resource: Option<String>,
    #[param(example = 50)]
    pub limit: Option<i64>,
}

impl ActivityLogQuery {
    /// Requested page size clamped to `1..=MAX_ACTIVITY_LIMIT`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT)
    }
}
