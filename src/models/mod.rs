pub mod activity;
pub mod project;
pub mod rbac;
pub mod task;
pub mod user;
