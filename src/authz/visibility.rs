use uuid::Uuid;

use crate::errors::{AppError, AppResult};

use super::identity::Identity;
use super::ownership::Owned;

/// Record types a list query can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Project,
    Task,
    User,
    Role,
    ActivityLog,
}

/// Constraints a list query runs with. Repositories translate this into the
/// `WHERE` clause, so an unreachable row is never read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Tasks only: restrict to one project.
    pub project_id: Option<Uuid>,
    /// Projects: `assigned_users` contains this user.
    /// Tasks: `assigned_to` equals this user.
    pub owner: Option<Uuid>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project_id: Option<Uuid>) -> Self {
        self.project_id = project_id;
        self
    }
}

/// Narrows `base` to what `identity` may see of `kind`.
///
/// Admins get `base`, narrowed to `requested_owner` when they ask for it.
/// Non-admins are pinned to their own projects/tasks whatever they request
/// and whatever `read` grants their role carries. Users, roles and activity
/// logs are gated at the endpoint, not here.
pub fn scope_query(
    identity: &Identity,
    kind: ResourceKind,
    base: ListFilter,
    requested_owner: Option<Uuid>,
) -> ListFilter {
    if identity.is_admin() {
        return ListFilter {
            owner: requested_owner.or(base.owner),
            ..base
        };
    }

    match kind {
        ResourceKind::Project | ResourceKind::Task => ListFilter {
            owner: Some(identity.user_id),
            ..base
        },
        ResourceKind::User | ResourceKind::Role | ResourceKind::ActivityLog => base,
    }
}

/// Single-record counterpart of [`scope_query`] for projects and tasks.
pub fn ensure_visible<R: Owned + ?Sized>(identity: &Identity, record: &R) -> AppResult<()> {
    if identity.is_admin() || record.is_owned_by(identity.user_id) {
        Ok(())
    } else {
        tracing::debug!(user_id = %identity.user_id, "record outside caller visibility");
        Err(AppError::forbidden("record is not assigned to you"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rbac::{Action, Permission, Resource, RoleSnapshot};

    fn identity(is_admin: bool, permissions: Vec<Permission>) -> Identity {
        Identity::new(
            Uuid::new_v4(),
            RoleSnapshot {
                id: Uuid::new_v4(),
                name: "r".to_string(),
                is_admin,
                permissions,
            },
        )
    }

    #[test]
    fn admin_filter_is_unchanged_without_requested_owner() {
        let admin = identity(true, vec![]);
        let base = ListFilter::new().with_project(Some(Uuid::new_v4()));
        assert_eq!(scope_query(&admin, ResourceKind::Task, base.clone(), None), base);
    }

    #[test]
    fn admin_may_narrow_to_any_user() {
        let admin = identity(true, vec![]);
        let other = Uuid::new_v4();
        let scoped = scope_query(&admin, ResourceKind::Project, ListFilter::new(), Some(other));
        assert_eq!(scoped.owner, Some(other));
    }

    #[test]
    fn non_admin_is_pinned_to_self_even_with_read_grant() {
        let member = identity(
            false,
            vec![
                Permission::new(Resource::Projects, [Action::Read]),
                Permission::new(Resource::Tasks, [Action::Read]),
            ],
        );
        let someone_else = Uuid::new_v4();

        for kind in [ResourceKind::Project, ResourceKind::Task] {
            let scoped = scope_query(&member, kind, ListFilter::new(), Some(someone_else));
            assert_eq!(scoped.owner, Some(member.user_id));
        }
    }

    #[test]
    fn non_admin_keeps_project_narrowing_on_tasks() {
        let member = identity(false, vec![]);
        let project_id = Uuid::new_v4();
        let scoped = scope_query(&member, ResourceKind::Task, ListFilter::new().with_project(Some(project_id)), None);
        assert_eq!(scoped.project_id, Some(project_id));
        assert_eq!(scoped.owner, Some(member.user_id));
    }

    #[test]
    fn endpoint_gated_kinds_pass_through() {
        let member = identity(false, vec![]);
        for kind in [ResourceKind::User, ResourceKind::Role, ResourceKind::ActivityLog] {
            assert_eq!(scope_query(&member, kind, ListFilter::new(), None), ListFilter::new());
        }
    }
}
