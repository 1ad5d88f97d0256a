pub mod activity;
pub mod auth;
pub mod health;
pub mod projects;
pub mod roles;
pub mod tasks;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body returned by delete endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
