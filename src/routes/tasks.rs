use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{authorize, ensure_visible, scope_query, Identity, ListFilter, Ownership, ResourceKind};
use crate::db::{projects, tasks, users};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, ActivityAction};
use crate::extract::ValidJson;
use crate::models::rbac::{Action, Resource};
use crate::models::task::{NewTask, Task, TaskChanges, TaskCreateRequest, TaskStatusRequest, TaskUpdateRequest};
use crate::routes::MessageResponse;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    pub project_id: Option<Uuid>,
    /// Admins only: tasks assigned to this user. Ignored for everyone else.
    pub user_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "Tasks",
    params(TaskListQuery),
    responses((status = 200, description = "Tasks visible to the caller", body = [Task]))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<TaskListQuery>,
) -> AppResult<Json<Vec<Task>>> {
    let base = ListFilter::new().with_project(query.project_id);
    let filter = scope_query(&identity, ResourceKind::Task, base, query.user_id);
    Ok(Json(tasks::list(&state.pool, &filter).await?))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Missing field or unknown assignee"),
        (status = 403, description = "Missing tasks:create"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    identity: Identity,
    ValidJson(payload): ValidJson<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let new_task = NewTask::try_from(payload)?;
    authorize(&identity, Resource::Tasks, Action::Create, Ownership::NotApplicable)?;

    if !projects::exists(&state.pool, new_task.project_id).await? {
        return Err(AppError::not_found("project not found"));
    }
    ensure_assignee_exists(&state, new_task.assigned_to).await?;

    let task = tasks::insert(&state.pool, &new_task, identity.user_id).await?;
    log_activity(
        &state.event_bus,
        ActivityAction::Create,
        identity.user_id,
        &task,
        format!("Task created: {}", task.title),
    );

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task detail", body = Task),
        (status = 403, description = "Task is not assigned to the caller"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Task>> {
    let task = fetch_task(&state, id).await?;
    ensure_visible(&identity, &task)?;
    Ok(Json(task))
}

/// Status-only update. The assignee may always move their own task.
#[utoipa::path(
    patch,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskStatusRequest,
    responses(
        (status = 200, description = "Task status updated", body = Task),
        (status = 403, description = "Neither assignee nor holder of tasks:update"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn update_task_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<TaskStatusRequest>,
) -> AppResult<Json<Task>> {
    let status = payload
        .status
        .ok_or_else(|| AppError::validation("status is required"))?;

    let task = fetch_task(&state, id).await?;
    authorize(&identity, Resource::Tasks, Action::Update, Ownership::of(&identity, &task))?;

    let task = tasks::update_status(&state.pool, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))?;
    log_activity(
        &state.event_bus,
        ActivityAction::Update,
        identity.user_id,
        &task,
        format!("Task status updated to {status}"),
    );

    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Missing tasks:update"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let changes = TaskChanges::try_from(payload)?;
    fetch_task(&state, id).await?;
    authorize(&identity, Resource::Tasks, Action::Update, Ownership::NotApplicable)?;
    ensure_assignee_exists(&state, changes.assigned_to).await?;

    let task = tasks::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))?;
    log_activity(
        &state.event_bus,
        ActivityAction::Update,
        identity.user_id,
        &task,
        format!("Task updated: {}", task.title),
    );

    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 403, description = "Missing tasks:delete"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let task = fetch_task(&state, id).await?;
    authorize(&identity, Resource::Tasks, Action::Delete, Ownership::NotApplicable)?;

    if !tasks::delete(&state.pool, id).await? {
        return Err(AppError::not_found("task not found"));
    }
    log_activity(
        &state.event_bus,
        ActivityAction::Delete,
        identity.user_id,
        &task,
        format!("Task deleted: {}", task.title),
    );

    Ok(Json(MessageResponse::new("Task deleted successfully")))
}

async fn fetch_task(state: &AppState, id: Uuid) -> AppResult<Task> {
    tasks::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))
}

async fn ensure_assignee_exists(state: &AppState, assignee: Uuid) -> AppResult<()> {
    if users::find_by_id(&state.pool, assignee).await?.is_none() {
        return Err(AppError::validation(format!("unknown assignee: {assignee}")));
    }
    Ok(())
}
