use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::Identity;
use crate::db::{self, roles, users};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, ActivityAction};
use crate::extract::ValidJson;
use crate::models::project::required_text;
use crate::models::rbac::{Role, RoleInput};
use crate::models::user::{AuthResponse, DbUser, LoginRequest, RegisterRequest, User};
use crate::utils::{hash_password, normalize_email, verify_password};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    security(()),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Missing field or password too short"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let name = required_text(payload.name, "name")?;
    let email = normalize_email(&required_text(payload.email, "email")?);
    let password = required_text(payload.password, "password")?;
    let password_hash = hash_password(&password)?;

    if users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::conflict("email already in use"));
    }

    let role = roles::ensure(&state.pool, &RoleInput::default_user()).await?;

    let db_user = users::insert(
        &state.pool,
        users::NewUser {
            name: &name,
            email: &email,
            password_hash: &password_hash,
            role_id: role.id,
        },
    )
    .await?;
    let user = User::try_from(db_user)?;
    let token = state.jwt.encode(user.id, role.snapshot())?;

    tracing::info!(user_id = %user.id, role = %role.name, "user registered");
    log_activity(&state.event_bus, ActivityAction::Create, user.id, &user, "User registration");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    security(()),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&required_text(payload.email, "email")?);
    let password = required_text(payload.password, "password")?;

    let db_user = users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::unauthenticated("invalid credentials"))?;

    if !verify_password(&password, &db_user.password_hash)? {
        return Err(AppError::unauthenticated("invalid credentials"));
    }

    let role = role_of(&state, &db_user).await?;
    let user = User::try_from(db_user)?;
    let token = state.jwt.encode(user.id, role.snapshot())?;

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me(State(state): State<AppState>, identity: Identity) -> AppResult<Json<User>> {
    let db_user = users::find_by_id(&state.pool, identity.user_id)
        .await?
        .ok_or_else(|| AppError::unauthenticated("user no longer exists"))?;
    Ok(Json(User::try_from(db_user)?))
}

async fn role_of(state: &AppState, db_user: &DbUser) -> AppResult<Role> {
    let role_id = db::parse_uuid(&db_user.role_id)?;
    roles::find_by_id(&state.pool, role_id)
        .await?
        .ok_or_else(|| AppError::internal(format!("role {role_id} missing for user {}", db_user.id)))
}
