use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::user::DbUser;

const USER_SELECT: &str = "SELECT u.id, u.name, u.email, u.password_hash, u.role_id, r.name AS role_name, r.is_admin AS role_is_admin, u.created_at, u.updated_at FROM users u INNER JOIN roles r ON r.id = u.role_id";

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role_id: Uuid,
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!("{USER_SELECT} WHERE u.id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!("{USER_SELECT} WHERE u.email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn insert(pool: &SqlitePool, new_user: NewUser<'_>) -> AppResult<DbUser> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(new_user.name)
    .bind(new_user.email)
    .bind(new_user.password_hash)
    .bind(new_user.role_id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let user = sqlx::query_as::<_, DbUser>(&format!("{USER_SELECT} WHERE u.id = ?"))
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(user)
}

/// Every user except `exclude`, newest first.
pub async fn list_except(pool: &SqlitePool, exclude: Uuid) -> AppResult<Vec<DbUser>> {
    let users = sqlx::query_as::<_, DbUser>(&format!(
        "{USER_SELECT} WHERE u.id <> ? ORDER BY u.created_at DESC, u.rowid DESC"
    ))
    .bind(exclude.to_string())
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Applies the given fields; `None` leaves a column untouched.
pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    name: Option<&str>,
    role_id: Option<Uuid>,
) -> AppResult<Option<DbUser>> {
    let result = sqlx::query(
        "UPDATE users SET name = COALESCE(?, name), role_id = COALESCE(?, role_id), updated_at = ? WHERE id = ?",
    )
    .bind(name)
    .bind(role_id.map(|r| r.to_string()))
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

pub async fn count_with_role(pool: &SqlitePool, role_id: Uuid) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role_id = ?")
        .bind(role_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Returns the subset of `ids` with no matching user.
pub async fn missing_ids(pool: &SqlitePool, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM users WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");

    let found: Vec<String> = builder.build_query_scalar::<String>().fetch_all(pool).await?;
    Ok(ids
        .iter()
        .filter(|id| !found.iter().any(|f| f == &id.to_string()))
        .copied()
        .collect())
}
