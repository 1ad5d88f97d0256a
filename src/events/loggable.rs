use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verbs recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
        }
    }
}

/// Trait for entities that can be recorded in the activity log.
pub trait Loggable: Send + Sync {
    /// Singular resource name stored on the log row (e.g. "task", "project").
    fn resource() -> &'static str;

    /// The record's primary key.
    fn subject_id(&self) -> Uuid;
}
