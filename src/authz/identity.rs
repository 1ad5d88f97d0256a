use uuid::Uuid;

use crate::models::rbac::RoleSnapshot;

/// The authenticated caller together with the role captured when its token
/// was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: RoleSnapshot,
}

impl Identity {
    pub fn new(user_id: Uuid, role: RoleSnapshot) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin
    }
}
