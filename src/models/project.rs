use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::parse_uuid;
use crate::errors::AppError;
use crate::models::user::UserSummary;

/// Lifecycle shared by projects and tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WorkStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::NotStarted => "not-started",
            WorkStatus::InProgress => "in-progress",
            WorkStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "not-started" => Ok(WorkStatus::NotStarted),
            "in-progress" => Ok(WorkStatus::InProgress),
            "completed" => Ok(WorkStatus::Completed),
            other => Err(AppError::validation(format!("unknown status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub status: WorkStatus,
    /// Rich-text blob. Only admins ever receive it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_keys: Option<String>,
    pub assigned_users: Vec<UserSummary>,
    pub created_by: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn redact_for(mut self, is_admin: bool) -> Self {
        if !is_admin {
            self.environment_keys = None;
        }
        self
    }
}

impl crate::events::Loggable for Project {
    fn resource() -> &'static str { "project" }
    fn subject_id(&self) -> Uuid { self.id }
}

/// Populated project reference on task payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub title: String,
}

/// A project row joined with its creator summary. Members are loaded separately.
#[derive(Debug, Clone, FromRow)]
pub struct DbProject {
    pub id: String,
    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub status: String,
    pub environment_keys: String,
    pub created_by: String,
    pub creator_name: String,
    pub creator_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbProject {
    pub fn into_project(self, assigned_users: Vec<UserSummary>) -> Result<Project, AppError> {
        Ok(Project {
            id: parse_uuid(&self.id)?,
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            status: self.status.parse().map_err(|_| {
                AppError::internal(format!("invalid stored status '{}'", self.status))
            })?,
            environment_keys: Some(self.environment_keys),
            assigned_users,
            created_by: UserSummary {
                id: parse_uuid(&self.created_by)?,
                name: self.creator_name,
                email: self.creator_email,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    #[schema(example = "Website relaunch")]
    pub title: Option<String>,
    #[schema(example = "Move the marketing site to the new stack.")]
    pub description: Option<String>,
    #[schema(format = DateTime, example = "2025-12-01T00:00:00Z")]
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<WorkStatus>,
    #[schema(example = "<p>API_KEY=...</p>")]
    pub environment_keys: Option<String>,
    pub assigned_users: Option<Vec<Uuid>>,
}

/// Full replacement of a project's editable fields. An absent
/// `environment_keys` keeps the stored value.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProjectUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(format = DateTime, example = "2025-12-15T00:00:00Z")]
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<WorkStatus>,
    pub environment_keys: Option<String>,
    pub assigned_users: Option<Vec<Uuid>>,
}

/// Validated project fields ready for the store.
#[derive(Debug, Clone)]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub status: WorkStatus,
    pub environment_keys: Option<String>,
    pub assigned_users: Vec<Uuid>,
}

impl ProjectInput {
    fn parse(
        title: Option<String>,
        description: Option<String>,
        deadline: Option<DateTime<Utc>>,
        status: Option<WorkStatus>,
        environment_keys: Option<String>,
        assigned_users: Option<Vec<Uuid>>,
    ) -> Result<Self, AppError> {
        let title = required_text(title, "title")?;
        let description = required_text(description, "description")?;
        let deadline = deadline.ok_or_else(|| AppError::validation("deadline is required"))?;
        let mut assigned_users = assigned_users
            .filter(|users| !users.is_empty())
            .ok_or_else(|| AppError::validation("at least one assigned user is required"))?;
        assigned_users.sort();
        assigned_users.dedup();

        Ok(Self {
            title,
            description,
            deadline,
            status: status.unwrap_or_default(),
            environment_keys,
            assigned_users,
        })
    }
}

impl TryFrom<ProjectCreateRequest> for ProjectInput {
    type Error = AppError;

    fn try_from(value: ProjectCreateRequest) -> Result<Self, Self::Error> {
        ProjectInput::parse(
            value.title,
            value.description,
            value.deadline,
            value.status,
            value.environment_keys,
            value.assigned_users,
        )
    }
}

impl TryFrom<ProjectUpdateRequest> for ProjectInput {
    type Error = AppError;

    fn try_from(value: ProjectUpdateRequest) -> Result<Self, Self::Error> {
        ProjectInput::parse(
            value.title,
            value.description,
            value.deadline,
            value.status,
            value.environment_keys,
            value.assigned_users,
        )
    }
}

pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation(format!("{field} is required")))
}
