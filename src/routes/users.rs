use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{authorize, require_admin, Identity, Ownership};
use crate::db::{roles, users};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, ActivityAction};
use crate::extract::ValidJson;
use crate::models::project::required_text;
use crate::models::rbac::{Action, Resource};
use crate::models::user::{User, UserUpdateRequest};

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "Every other user, newest first", body = [User]),
        (status = 403, description = "Missing users:read")
    )
)]
pub async fn list_users(State(state): State<AppState>, identity: Identity) -> AppResult<Json<Vec<User>>> {
    authorize(&identity, Resource::Users, Action::Read, Ownership::NotApplicable)?;

    let rows = users::list_except(&state.pool, identity.user_id).await?;
    let list = rows.into_iter().map(User::try_from).collect::<AppResult<Vec<_>>>()?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = User),
        (status = 403, description = "Neither self nor holder of users:read"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let user = fetch_user(&state, id).await?;
    authorize(&identity, Resource::Users, Action::Read, Ownership::of(&identity, &user))?;
    Ok(Json(user))
}

/// Profile edit. Changing `role_id` is reserved to admins, including on
/// their own account.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Empty update or unknown role"),
        (status = 403, description = "Not permitted to edit this user or its role"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    if payload.name.is_none() && payload.role_id.is_none() {
        return Err(AppError::validation("nothing to update"));
    }
    let name = payload.name.map(|name| required_text(Some(name), "name")).transpose()?;

    let user = fetch_user(&state, id).await?;
    authorize(&identity, Resource::Users, Action::Update, Ownership::of(&identity, &user))?;

    if let Some(role_id) = payload.role_id {
        require_admin(&identity)?;
        if roles::find_by_id(&state.pool, role_id).await?.is_none() {
            return Err(AppError::validation(format!("unknown role: {role_id}")));
        }
    }

    let db_user = users::update(&state.pool, id, name.as_deref(), payload.role_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    let user = User::try_from(db_user)?;

    let details = match payload.role_id {
        Some(_) => format!("User updated: {} (role set to {})", user.email, user.role.name),
        None => format!("User updated: {}", user.email),
    };
    log_activity(&state.event_bus, ActivityAction::Update, identity.user_id, &user, details);

    Ok(Json(user))
}

async fn fetch_user(state: &AppState, id: Uuid) -> AppResult<User> {
    let db_user = users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    User::try_from(db_user)
}
