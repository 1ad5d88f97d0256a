use crate::errors::{AppError, AppResult};
use crate::models::rbac::{Action, Resource, RoleSnapshot};

use super::identity::Identity;
use super::ownership::Ownership;

/// Whether `role` grants `action` on `resource`.
///
/// Evaluation order:
/// 1. admin role -> allow
/// 2. no permission entry for the resource -> deny
/// 3. allow iff the entry lists the action
///
/// Matching is exact. There are no wildcard resources and no implied
/// actions (`update` does not grant `read`).
pub fn is_allowed(role: &RoleSnapshot, resource: Resource, action: Action) -> bool {
    if role.is_admin {
        return true;
    }

    role.permissions
        .iter()
        .find(|permission| permission.resource == resource)
        .is_some_and(|permission| permission.allows(action))
}

/// Combined per-request decision: admin, explicit grant, or an applicable
/// ownership shortcut.
pub fn decide(identity: &Identity, resource: Resource, action: Action, ownership: Ownership) -> bool {
    if identity.is_admin() {
        tracing::debug!(user_id = %identity.user_id, %resource, %action, "admin bypass");
        return true;
    }

    if is_allowed(&identity.role, resource, action) {
        tracing::debug!(user_id = %identity.user_id, %resource, %action, "permission match");
        return true;
    }

    if ownership == Ownership::Owner {
        tracing::debug!(user_id = %identity.user_id, %resource, %action, "ownership shortcut");
        return true;
    }

    tracing::debug!(user_id = %identity.user_id, %resource, %action, "permission denied");
    false
}

/// [`decide`], failing with `Forbidden` on denial.
pub fn authorize(identity: &Identity, resource: Resource, action: Action, ownership: Ownership) -> AppResult<()> {
    if decide(identity, resource, action, ownership) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!("missing permission {resource}:{action}")))
    }
}

pub fn require_admin(identity: &Identity) -> AppResult<()> {
    if identity.is_admin() {
        Ok(())
    } else {
        tracing::debug!(user_id = %identity.user_id, "admin required");
        Err(AppError::forbidden("administrator role required"))
    }
}
