use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::authz::ListFilter;
use crate::errors::{AppError, AppResult};
use crate::models::project::WorkStatus;
use crate::models::task::{DbTask, NewTask, Task, TaskChanges};

const TASK_SELECT: &str = "SELECT t.id, t.title, t.description, t.status, t.project_id, p.title AS project_title, t.assigned_to, a.name AS assignee_name, a.email AS assignee_email, t.created_by, c.name AS creator_name, c.email AS creator_email, t.created_at, t.updated_at FROM tasks t INNER JOIN projects p ON p.id = t.project_id INNER JOIN users a ON a.id = t.assigned_to INNER JOIN users c ON c.id = t.created_by";

/// Lists tasks matching an already-scoped filter, newest first.
pub async fn list(pool: &SqlitePool, filter: &ListFilter) -> AppResult<Vec<Task>> {
    let mut builder = QueryBuilder::<Sqlite>::new(TASK_SELECT);
    builder.push(" WHERE 1 = 1");
    if let Some(project_id) = filter.project_id {
        builder.push(" AND t.project_id = ").push_bind(project_id.to_string());
    }
    if let Some(owner) = filter.owner {
        builder.push(" AND t.assigned_to = ").push_bind(owner.to_string());
    }
    builder.push(" ORDER BY t.created_at DESC, t.rowid DESC");

    let rows = builder.build_query_as::<DbTask>().fetch_all(pool).await?;
    rows.into_iter().map(Task::try_from).collect()
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> AppResult<Option<Task>> {
    sqlx::query_as::<_, DbTask>(&format!("{TASK_SELECT} WHERE t.id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .map(Task::try_from)
        .transpose()
}

pub async fn insert(pool: &SqlitePool, task: &NewTask, created_by: Uuid) -> AppResult<Task> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, project_id, assigned_to, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status.as_str())
    .bind(task.project_id.to_string())
    .bind(task.assigned_to.to_string())
    .bind(created_by.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::internal("task missing after insert"))
}

pub async fn update(pool: &SqlitePool, id: Uuid, changes: &TaskChanges) -> AppResult<Option<Task>> {
    let result = sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, status = ?, assigned_to = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.status.as_str())
    .bind(changes.assigned_to.to_string())
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

pub async fn update_status(pool: &SqlitePool, id: Uuid, status: WorkStatus) -> AppResult<Option<Task>> {
    let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
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
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes every task of a project. Used by the project cascade.
pub async fn delete_by_project(conn: &mut SqliteConnection, project_id: Uuid) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM tasks WHERE project_id = ?")
        .bind(project_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
