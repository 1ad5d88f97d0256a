//! Ownership predicates, one per record type.
//!
//! Handlers pass [`Ownership::of`] into [`super::decide`] only for the
//! operations where an ownership shortcut applies:
//!
//! | record  | owner                       | shortcut for            |
//! |---------|-----------------------------|-------------------------|
//! | Project | listed in `assigned_users`  | read                    |
//! | Task    | `assigned_to`               | read, status update     |
//! | User    | the user themself           | read, profile patch     |
//!
//! Roles and activity logs have no owner.

use uuid::Uuid;

use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::user::User;

use super::identity::Identity;

pub trait Owned {
    fn is_owned_by(&self, user_id: Uuid) -> bool;
}

impl Owned for Project {
    fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.assigned_users.iter().any(|user| user.id == user_id)
    }
}

impl Owned for Task {
    fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.assigned_to.id == user_id
    }
}

impl Owned for User {
    fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The operation has no ownership shortcut.
    NotApplicable,
    Owner,
    NotOwner,
}

impl Ownership {
    pub fn of<R: Owned + ?Sized>(identity: &Identity, record: &R) -> Self {
        if record.is_owned_by(identity.user_id) {
            Ownership::Owner
        } else {
            Ownership::NotOwner
        }
    }
}
