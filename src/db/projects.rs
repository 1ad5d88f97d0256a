use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::authz::ListFilter;
use crate::db::parse_uuid;
use crate::errors::{AppError, AppResult};
use crate::models::project::{DbProject, Project, ProjectInput};
use crate::models::user::UserSummary;

const PROJECT_SELECT: &str = "SELECT p.id, p.title, p.description, p.deadline, p.status, p.environment_keys, p.created_by, c.name AS creator_name, c.email AS creator_email, p.created_at, p.updated_at FROM projects p INNER JOIN users c ON c.id = p.created_by";

/// Lists projects matching an already-scoped filter, newest first.
pub async fn list(pool: &SqlitePool, filter: &ListFilter) -> AppResult<Vec<Project>> {
    let mut builder = QueryBuilder::<Sqlite>::new(PROJECT_SELECT);
    builder.push(" WHERE 1 = 1");
    if let Some(owner) = filter.owner {
        builder
            .push(" AND EXISTS (SELECT 1 FROM project_members pm WHERE pm.project_id = p.id AND pm.user_id = ")
            .push_bind(owner.to_string())
            .push(")");
    }
    builder.push(" ORDER BY p.created_at DESC, p.rowid DESC");

    let rows = builder.build_query_as::<DbProject>().fetch_all(pool).await?;

    let mut projects = Vec::with_capacity(rows.len());
    for row in rows {
        projects.push(populate(pool, row).await?);
    }
    Ok(projects)
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Project>> {
    let row = sqlx::query_as::<_, DbProject>(&format!("{PROJECT_SELECT} WHERE p.id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(populate(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn exists(pool: &SqlitePool, id: Uuid) -> AppResult<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(found > 0)
}

pub async fn insert(pool: &SqlitePool, input: &ProjectInput, created_by: Uuid) -> AppResult<Project> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO projects (id, title, description, deadline, status, environment_keys, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.deadline)
    .bind(input.status.as_str())
    .bind(input.environment_keys.as_deref().unwrap_or_default())
    .bind(created_by.to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    replace_members(&mut tx, id, &input.assigned_users).await?;
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::internal("project missing after insert"))
}

/// Full replacement. `environment_keys: None` keeps the stored blob.
pub async fn update(pool: &SqlitePool, id: Uuid, input: &ProjectInput) -> AppResult<Option<Project>> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE projects SET title = ?, description = ?, deadline = ?, status = ?, environment_keys = COALESCE(?, environment_keys), updated_at = ? WHERE id = ?",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.deadline)
    .bind(input.status.as_str())
    .bind(input.environment_keys.as_deref())
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    replace_members(&mut tx, id, &input.assigned_users).await?;
    tx.commit().await?;

    find_by_id(pool, id).await
}

/// Deletes the project and every task referencing it. Returns the number of
/// tasks removed, or `None` when the project did not exist.
pub async fn delete_cascade(pool: &SqlitePool, id: Uuid) -> AppResult<Option<u64>> {
    let mut tx = pool.begin().await?;

    let tasks_removed = crate::db::tasks::delete_by_project(&mut tx, id).await?;

    sqlx::query("DELETE FROM project_members WHERE project_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    Ok(Some(tasks_removed))
}

async fn replace_members(conn: &mut SqliteConnection, project_id: Uuid, members: &[Uuid]) -> AppResult<()> {
    sqlx::query("DELETE FROM project_members WHERE project_id = ?")
        .bind(project_id.to_string())
        .execute(&mut *conn)
        .await?;

    for user_id in members {
        sqlx::query("INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES (?, ?)")
            .bind(project_id.to_string())
            .bind(user_id.to_string())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn members(pool: &SqlitePool, project_id: &str) -> AppResult<Vec<UserSummary>> {
    let rows = sqlx::query_as::<_, (String, String, String)>(
        "SELECT u.id, u.name, u.email FROM project_members pm INNER JOIN users u ON u.id = pm.user_id WHERE pm.project_id = ? ORDER BY u.name",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, name, email)| Ok(UserSummary { id: parse_uuid(&id)?, name, email }))
        .collect()
}

async fn populate(pool: &SqlitePool, row: DbProject) -> AppResult<Project> {
    let assigned_users = members(pool, &row.id).await?;
    row.into_project(assigned_users)
}
