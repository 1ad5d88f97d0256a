use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::parse_uuid;
use crate::errors::AppError;
use crate::models::project::{required_text, ProjectSummary, WorkStatus};
use crate::models::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: WorkStatus,
    pub project: ProjectSummary,
    pub assigned_to: UserSummary,
    pub created_by: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Task {
    fn resource() -> &'static str { "task" }
    fn subject_id(&self) -> Uuid { self.id }
}

/// Task row with its project, assignee and creator already joined in.
#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub project_id: String,
    pub project_title: String,
    pub assigned_to: String,
    pub assignee_name: String,
    pub assignee_email: String,
    pub created_by: String,
    pub creator_name: String,
    pub creator_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        Ok(Task {
            id: parse_uuid(&value.id)?,
            title: value.title,
            description: value.description,
            status: value.status.parse().map_err(|_| {
                AppError::internal(format!("invalid stored status '{}'", value.status))
            })?,
            project: ProjectSummary {
                id: parse_uuid(&value.project_id)?,
                title: value.project_title,
            },
            assigned_to: UserSummary {
                id: parse_uuid(&value.assigned_to)?,
                name: value.assignee_name,
                email: value.assignee_email,
            },
            created_by: UserSummary {
                id: parse_uuid(&value.created_by)?,
                name: value.creator_name,
                email: value.creator_email,
            },
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    #[schema(example = "Draft the landing page copy")]
    pub title: Option<String>,
    #[schema(example = "Two variants for A/B testing.")]
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<WorkStatus>,
}

/// Full replacement of a task's editable fields.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<WorkStatus>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskStatusRequest {
    pub status: Option<WorkStatus>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub project_id: Uuid,
    pub assigned_to: Uuid,
    pub status: WorkStatus,
}

impl TryFrom<TaskCreateRequest> for NewTask {
    type Error = AppError;

    fn try_from(value: TaskCreateRequest) -> Result<Self, Self::Error> {
        Ok(NewTask {
            title: required_text(value.title, "title")?,
            description: required_text(value.description, "description")?,
            project_id: value.project_id.ok_or_else(|| AppError::validation("project_id is required"))?,
            assigned_to: value.assigned_to.ok_or_else(|| AppError::validation("assigned_to is required"))?,
            status: value.status.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskChanges {
    pub title: String,
    pub description: String,
    pub status: WorkStatus,
    pub assigned_to: Uuid,
}

impl TryFrom<TaskUpdateRequest> for TaskChanges {
    type Error = AppError;

    fn try_from(value: TaskUpdateRequest) -> Result<Self, Self::Error> {
        Ok(TaskChanges {
            title: required_text(value.title, "title")?,
            description: required_text(value.description, "description")?,
            status: value.status.ok_or_else(|| AppError::validation("status is required"))?,
            assigned_to: value.assigned_to.ok_or_else(|| AppError::validation("assigned_to is required"))?,
        })
    }
}
