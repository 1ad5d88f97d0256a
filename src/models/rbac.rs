use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::Loggable;

/// Role handed to every self-registered user.
pub const DEFAULT_ROLE_NAME: &str = "User";
pub const DEFAULT_ROLE_DESCRIPTION: &str = "Regular user with limited permissions";

/// Role bound to operator-bootstrapped administrators.
pub const ADMIN_ROLE_NAME: &str = "Admin";
pub const ADMIN_ROLE_DESCRIPTION: &str = "Full access to every resource";

// =============================================================================
// RESOURCE / ACTION
// =============================================================================

/// Resources a permission entry can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Projects,
    Tasks,
    Users,
    Roles,
    ActivityLogs,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Projects => "projects",
            Resource::Tasks => "tasks",
            Resource::Users => "users",
            Resource::Roles => "roles",
            Resource::ActivityLogs => "activity_logs",
        }
    }

    #[cfg(test)]
    pub fn all() -> &'static [Resource] {
        &[
            Resource::Projects,
            Resource::Tasks,
            Resource::Users,
            Resource::Roles,
            Resource::ActivityLogs,
        ]
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PERMISSION
// =============================================================================

/// A resource plus the set of actions granted on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub resource: Resource,
    #[schema(value_type = Vec<Action>)]
    pub actions: BTreeSet<Action>,
}

impl Permission {
    pub fn new(resource: Resource, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            resource,
            actions: actions.into_iter().collect(),
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// Rejects permission lists that mention the same resource twice.
pub fn validate_permissions(permissions: &[Permission]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(permissions.len());
    for permission in permissions {
        if !seen.insert(permission.resource) {
            return Err(AppError::validation(format!(
                "duplicate permission entry for resource '{}'",
                permission.resource
            )));
        }
    }
    Ok(())
}

pub fn default_user_permissions() -> Vec<Permission> {
    vec![
        Permission::new(Resource::Projects, [Action::Read]),
        Permission::new(Resource::Tasks, [Action::Read, Action::Update]),
    ]
}

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_admin: bool,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Point-in-time copy embedded in issued tokens.
    pub fn snapshot(&self) -> RoleSnapshot {
        RoleSnapshot {
            id: self.id,
            name: self.name.clone(),
            is_admin: self.is_admin,
            permissions: self.permissions.clone(),
        }
    }
}

impl Loggable for Role {
    fn resource() -> &'static str { "role" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRole {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_admin: bool,
    pub permissions: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbRole> for Role {
    type Error = AppError;

    fn try_from(value: DbRole) -> Result<Self, Self::Error> {
        let permissions: Vec<Permission> = serde_json::from_str(&value.permissions)
            .map_err(|err| AppError::internal(format!("invalid permissions for role {}: {err}", value.id)))?;

        Ok(Role {
            id: crate::db::parse_uuid(&value.id)?,
            name: value.name,
            description: value.description,
            is_admin: value.is_admin,
            permissions,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// The role as captured at authentication time. Edits to the stored role
/// are not visible here until the holder authenticates again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleSnapshot {
    pub id: Uuid,
    pub name: String,
    pub is_admin: bool,
    pub permissions: Vec<Permission>,
}

/// Populated role reference on user payloads.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
    pub is_admin: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleCreateRequest {
    #[schema(example = "Project Manager")]
    pub name: Option<String>,
    #[schema(example = "Creates and edits projects")]
    pub description: Option<String>,
    pub permissions: Option<Vec<Permission>>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Full replacement of a role's editable fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<Permission>>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Validated role fields shared by create and update.
#[derive(Debug, Clone)]
pub struct RoleInput {
    pub name: String,
    pub description: String,
    pub is_admin: bool,
    pub permissions: Vec<Permission>,
}

impl RoleInput {
    pub fn parse(
        name: Option<String>,
        description: Option<String>,
        permissions: Option<Vec<Permission>>,
        is_admin: bool,
    ) -> Result<Self, AppError> {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::validation("role name is required"))?;
        let description = description
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| AppError::validation("role description is required"))?;
        let permissions = permissions.ok_or_else(|| AppError::validation("role permissions are required"))?;
        validate_permissions(&permissions)?;

        Ok(Self {
            name,
            description,
            is_admin,
            permissions,
        })
    }

    /// The role registration falls back to.
    pub fn default_user() -> Self {
        Self {
            name: DEFAULT_ROLE_NAME.to_string(),
            description: DEFAULT_ROLE_DESCRIPTION.to_string(),
            is_admin: false,
            permissions: default_user_permissions(),
        }
    }

    pub fn admin() -> Self {
        Self {
            name: ADMIN_ROLE_NAME.to_string(),
            description: ADMIN_ROLE_DESCRIPTION.to_string(),
            is_admin: true,
            permissions: Vec::new(),
        }
    }
}

impl TryFrom<RoleCreateRequest> for RoleInput {
    type Error = AppError;

    fn try_from(value: RoleCreateRequest) -> Result<Self, Self::Error> {
        RoleInput::parse(value.name, value.description, value.permissions, value.is_admin)
    }
}

impl TryFrom<RoleUpdateRequest> for RoleInput {
    type Error = AppError;

    fn try_from(value: RoleUpdateRequest) -> Result<Self, Self::Error> {
        RoleInput::parse(value.name, value.description, value.permissions, value.is_admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_wire_names_match_as_str() {
        for resource in Resource::all() {
            let wire = serde_json::to_value(resource).unwrap();
            assert_eq!(wire, resource.as_str());
        }
        assert!(serde_json::from_str::<Resource>(r#""Projects""#).is_err());
    }

    #[test]
    fn unknown_resource_fails_deserialization() {
        let raw = r#"{"resource": "taks", "actions": ["read"]}"#;
        assert!(serde_json::from_str::<Permission>(raw).is_err());
    }

    #[test]
    fn duplicate_actions_collapse() {
        let raw = r#"{"resource": "tasks", "actions": ["read", "read", "update"]}"#;
        let permission: Permission = serde_json::from_str(raw).unwrap();
        assert_eq!(permission.actions.len(), 2);
    }

    #[test]
    fn duplicate_resource_entries_are_rejected() {
        let permissions = vec![
            Permission::new(Resource::Tasks, [Action::Read]),
            Permission::new(Resource::Tasks, [Action::Update]),
        ];
        assert!(matches!(validate_permissions(&permissions), Err(AppError::Validation(_))));
        assert!(validate_permissions(&default_user_permissions()).is_ok());
    }

    #[test]
    fn role_input_requires_name_description_and_permissions() {
        let missing_name = RoleInput::parse(None, Some("d".into()), Some(vec![]), false);
        assert!(matches!(missing_name, Err(AppError::Validation(_))));

        let blank_name = RoleInput::parse(Some("  ".into()), Some("d".into()), Some(vec![]), false);
        assert!(matches!(blank_name, Err(AppError::Validation(_))));

        let missing_permissions = RoleInput::parse(Some("Viewer".into()), Some("d".into()), None, false);
        assert!(matches!(missing_permissions, Err(AppError::Validation(_))));

        let ok = RoleInput::parse(Some(" Viewer ".into()), Some("d".into()), Some(vec![]), true).unwrap();
        assert_eq!(ok.name, "Viewer");
        assert!(ok.is_admin);
    }
}
