use axum::Router;
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health_check,
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::projects::list_projects,
		routes::projects::create_project,
		routes::projects::get_project,
		routes::projects::update_project,
		routes::projects::delete_project,
		routes::tasks::list_tasks,
		routes::tasks::create_task,
		routes::tasks::get_task,
		routes::tasks::update_task,
		routes::tasks::update_task_status,
		routes::tasks::delete_task,
		routes::users::list_users,
		routes::users::get_user,
		routes::users::update_user,
		routes::roles::list_roles,
		routes::roles::create_role,
		routes::roles::get_role,
		routes::roles::update_role,
		routes::roles::delete_role,
		routes::activity::list_activity_logs
	),
	components(
		schemas(
			routes::health::HealthResponse,
			routes::MessageResponse,
			models::user::User,
			models::user::UserSummary,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::user::UserUpdateRequest,
			models::rbac::Resource,
			models::rbac::Action,
			models::rbac::Permission,
			models::rbac::Role,
			models::rbac::RoleSummary,
			models::rbac::RoleCreateRequest,
			models::rbac::RoleUpdateRequest,
			models::project::WorkStatus,
			models::project::Project,
			models::project::ProjectSummary,
			models::project::ProjectCreateRequest,
			models::project::ProjectUpdateRequest,
			models::task::Task,
			models::task::TaskCreateRequest,
			models::task::TaskUpdateRequest,
			models::task::TaskStatusRequest,
			models::activity::ActivityLog
		)
	),
	tags(
		(name = "Health", description = "Liveness and database reachability"),
		(name = "Auth", description = "Registration, login and the current user"),
		(name = "Projects", description = "Projects visible to the caller"),
		(name = "Tasks", description = "Tasks visible to the caller"),
		(name = "Users", description = "User directory and profile edits"),
		(name = "Roles", description = "Role and permission administration"),
		(name = "Activity", description = "Audit trail of mutations")
	)
)]
pub struct ApiDoc;

/// The derived document plus the bearer scheme every protected route uses.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
	let base = ApiDoc::openapi();
	match with_bearer_security(&base) {
		Ok(doc) => doc,
		Err(err) => {
			tracing::warn!(error = %err, "failed to attach security scheme to OpenAPI document");
			base
		}
	}
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
	Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", doc))
}

fn with_bearer_security(doc: &utoipa::openapi::OpenApi) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut value = serde_json::to_value(doc)?;
	ensure_security_components(&mut value)?;
	ensure_global_security(&mut value)?;
	Ok(serde_json::from_value(value)?)
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let root = doc
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))?;
	let components = root
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("components must be an object"))?;
	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("securitySchemes must be an object"))?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT"
		}),
	);
	Ok(())
}

// Register, login and health opt out per operation with `security(())`.
fn ensure_global_security(doc: &mut Value) -> anyhow::Result<()> {
	doc.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))?
		.entry("security")
		.or_insert_with(|| json!([{ "bearerAuth": [] }]));
	Ok(())
}
