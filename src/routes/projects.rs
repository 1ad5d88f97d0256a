use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{authorize, ensure_visible, scope_query, Identity, ListFilter, Ownership, ResourceKind};
use crate::db::{projects, users};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, ActivityAction};
use crate::extract::ValidJson;
use crate::models::project::{Project, ProjectCreateRequest, ProjectInput, ProjectUpdateRequest};
use crate::models::rbac::{Action, Resource};
use crate::routes::MessageResponse;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectListQuery {
    /// Admins only: projects assigned to this user. Ignored for everyone else.
    pub user_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    params(ProjectListQuery),
    responses((status = 200, description = "Projects visible to the caller", body = [Project]))
)]
pub async fn list_projects(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ProjectListQuery>,
) -> AppResult<Json<Vec<Project>>> {
    let filter = scope_query(&identity, ResourceKind::Project, ListFilter::new(), query.user_id);
    let projects = projects::list(&state.pool, &filter).await?;

    Ok(Json(
        projects
            .into_iter()
            .map(|project| project.redact_for(identity.is_admin()))
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Missing field or unknown assigned user"),
        (status = 403, description = "Missing projects:create")
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    identity: Identity,
    ValidJson(payload): ValidJson<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let input = ProjectInput::try_from(payload)?;
    authorize(&identity, Resource::Projects, Action::Create, Ownership::NotApplicable)?;
    ensure_users_exist(&state, &input.assigned_users).await?;

    let project = projects::insert(&state.pool, &input, identity.user_id).await?;
    log_activity(
        &state.event_bus,
        ActivityAction::Create,
        identity.user_id,
        &project,
        format!("Project created: {}", project.title),
    );

    Ok((StatusCode::CREATED, Json(project.redact_for(identity.is_admin()))))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project detail", body = Project),
        (status = 403, description = "Caller is not assigned to the project"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let project = fetch_project(&state, id).await?;
    ensure_visible(&identity, &project)?;
    Ok(Json(project.redact_for(identity.is_admin())))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses(
        (status = 200, description = "Project updated", body = Project),
        (status = 403, description = "Missing projects:update"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn update_project(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    let input = ProjectInput::try_from(payload)?;
    fetch_project(&state, id).await?;
    authorize(&identity, Resource::Projects, Action::Update, Ownership::NotApplicable)?;
    ensure_users_exist(&state, &input.assigned_users).await?;

    let project = projects::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))?;
    log_activity(
        &state.event_bus,
        ActivityAction::Update,
        identity.user_id,
        &project,
        format!("Project updated: {}", project.title),
    );

    Ok(Json(project.redact_for(identity.is_admin())))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project and its tasks deleted", body = MessageResponse),
        (status = 403, description = "Missing projects:delete"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let project = fetch_project(&state, id).await?;
    authorize(&identity, Resource::Projects, Action::Delete, Ownership::NotApplicable)?;

    let tasks_removed = projects::delete_cascade(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))?;

    tracing::info!(project_id = %id, tasks_removed, "project deleted");
    log_activity(
        &state.event_bus,
        ActivityAction::Delete,
        identity.user_id,
        &project,
        format!("Project deleted: {} ({tasks_removed} tasks removed)", project.title),
    );

    Ok(Json(MessageResponse::new("Project deleted successfully")))
}

async fn fetch_project(state: &AppState, id: Uuid) -> AppResult<Project> {
    projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))
}

async fn ensure_users_exist(state: &AppState, ids: &[Uuid]) -> AppResult<()> {
    let missing = users::missing_ids(&state.pool, ids).await?;
    if missing.is_empty() {
        return Ok(());
    }

    let missing: Vec<String> = missing.iter().map(Uuid::to_string).collect();
    Err(AppError::validation(format!("unknown assigned users: {}", missing.join(", "))))
}
