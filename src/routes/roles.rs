use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{require_admin, Identity};
use crate::db::{roles, users};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, ActivityAction};
use crate::extract::ValidJson;
use crate::models::rbac::{Role, RoleCreateRequest, RoleInput, RoleUpdateRequest};
use crate::routes::MessageResponse;

#[utoipa::path(
    get,
    path = "/roles",
    tag = "Roles",
    responses(
        (status = 200, description = "All roles, newest first", body = [Role]),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_roles(State(state): State<AppState>, identity: Identity) -> AppResult<Json<Vec<Role>>> {
    require_admin(&identity)?;
    Ok(Json(roles::list(&state.pool).await?))
}

#[utoipa::path(
    post,
    path = "/roles",
    tag = "Roles",
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Missing field or duplicate resource entry"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Role name already taken")
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    identity: Identity,
    ValidJson(payload): ValidJson<RoleCreateRequest>,
) -> AppResult<(StatusCode, Json<Role>)> {
    let input = RoleInput::try_from(payload)?;
    require_admin(&identity)?;

    let role = roles::insert(&state.pool, &input)
        .await
        .map_err(|err| name_taken(err, &input))?;
    log_activity(
        &state.event_bus,
        ActivityAction::Create,
        identity.user_id,
        &role,
        format!("Role created: {}", role.name),
    );

    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/roles/{id}",
    tag = "Roles",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role detail", body = Role),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Role not found")
    )
)]
pub async fn get_role(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Role>> {
    let role = fetch_role(&state, id).await?;
    require_admin(&identity)?;
    Ok(Json(role))
}

/// Full replacement of name, description, admin flag and permissions.
/// Tokens issued before the edit keep the old permissions until re-login.
#[utoipa::path(
    put,
    path = "/roles/{id}",
    tag = "Roles",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Role name already taken")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<RoleUpdateRequest>,
) -> AppResult<Json<Role>> {
    let input = RoleInput::try_from(payload)?;
    fetch_role(&state, id).await?;
    require_admin(&identity)?;

    let role = roles::update(&state.pool, id, &input)
        .await
        .map_err(|err| name_taken(err, &input))?
        .ok_or_else(|| AppError::not_found("role not found"))?;
    log_activity(
        &state.event_bus,
        ActivityAction::Update,
        identity.user_id,
        &role,
        format!("Role updated: {}", role.name),
    );

    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = "Roles",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Role is still assigned to users")
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let role = fetch_role(&state, id).await?;
    require_admin(&identity)?;

    // Check and delete are separate statements. A user bound in between
    // trips the foreign key, which also answers 409.
    let in_use = users::count_with_role(&state.pool, id).await?;
    if in_use > 0 {
        return Err(AppError::conflict(format!(
            "role '{}' is assigned to {in_use} user(s)",
            role.name
        )));
    }

    if !roles::delete(&state.pool, id).await? {
        return Err(AppError::not_found("role not found"));
    }
    log_activity(
        &state.event_bus,
        ActivityAction::Delete,
        identity.user_id,
        &role,
        format!("Role deleted: {}", role.name),
    );

    Ok(Json(MessageResponse::new("Role deleted successfully")))
}

async fn fetch_role(state: &AppState, id: Uuid) -> AppResult<Role> {
    roles::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("role not found"))
}

fn name_taken(err: AppError, input: &RoleInput) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::conflict(format!("role '{}' already exists", input.name)),
        other => other,
    }
}
