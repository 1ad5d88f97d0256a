use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::rbac::{DbRole, Permission, Role, RoleInput};

const ROLE_SELECT: &str = "SELECT id, name, description, is_admin, permissions, created_at, updated_at FROM roles";

fn encode_permissions(permissions: &[Permission]) -> AppResult<String> {
    serde_json::to_string(permissions)
        .map_err(|err| AppError::internal(format!("failed to encode permissions: {err}")))
}

pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Role>> {
    let rows = sqlx::query_as::<_, DbRole>(&format!("{ROLE_SELECT} ORDER BY created_at DESC, rowid DESC"))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Role::try_from).collect()
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Role>> {
    sqlx::query_as::<_, DbRole>(&format!("{ROLE_SELECT} WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .map(Role::try_from)
        .transpose()
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> AppResult<Option<Role>> {
    sqlx::query_as::<_, DbRole>(&format!("{ROLE_SELECT} WHERE name = ?"))
        .bind(name)
        .fetch_optional(pool)
        .await?
        .map(Role::try_from)
        .transpose()
}

/// Fails with `Conflict` when the name is taken.
pub async fn insert(pool: &SqlitePool, input: &RoleInput) -> AppResult<Role> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO roles (id, name, description, is_admin, permissions, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.is_admin)
    .bind(encode_permissions(&input.permissions)?)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Role {
        id,
        name: input.name.clone(),
        description: input.description.clone(),
        is_admin: input.is_admin,
        permissions: input.permissions.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn update(pool: &SqlitePool, id: Uuid, input: &RoleInput) -> AppResult<Option<Role>> {
    let result = sqlx::query(
        "UPDATE roles SET name = ?, description = ?, is_admin = ?, permissions = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.is_admin)
    .bind(encode_permissions(&input.permissions)?)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM roles WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Looks the role up by name and creates it from `input` when absent.
/// Losing a concurrent creation race falls back to the winner's row.
pub async fn ensure(pool: &SqlitePool, input: &RoleInput) -> AppResult<Role> {
    if let Some(role) = find_by_name(pool, &input.name).await? {
        return Ok(role);
    }

    match insert(pool, input).await {
        Ok(role) => {
            tracing::info!(role = %role.name, "created missing role");
            Ok(role)
        }
        Err(AppError::Conflict(_)) => find_by_name(pool, &input.name)
            .await?
            .ok_or_else(|| AppError::internal(format!("role '{}' vanished after conflict", input.name))),
        Err(err) => Err(err),
    }
}
