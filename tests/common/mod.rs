#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use rbac_tracker::create_app_with;
use rbac_tracker::db::roles;
use rbac_tracker::jwt::JwtConfig;
use rbac_tracker::models::rbac::RoleInput;

pub const PASSWORD: &str = "password123";

/// Router over a fresh, migrated temp-file database. Keep the `TempDir`
/// alive for the duration of the test.
pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn setup() -> Result<TestApp> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    let app = create_app_with(pool.clone(), JwtConfig::new("test-secret", 1));

    Ok(TestApp { app, pool, _dir: dir })
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send("GET", uri, Some(token), None).await
    }

    /// Registers a user and returns `(token, user_id)`.
    pub async fn register(&self, name: &str, email: &str) -> Result<(String, Uuid)> {
        let (status, body) = self
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        Ok((token_of(&body), id_of(&body["user"])))
    }

    pub async fn login(&self, email: &str) -> Result<String> {
        let (status, body) = self
            .send("POST", "/auth/login", None, Some(json!({ "email": email, "password": PASSWORD })))
            .await?;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        Ok(token_of(&body))
    }

    /// Registers a user, binds it to the admin role directly in the store
    /// and logs in again so the token carries the admin snapshot.
    pub async fn admin(&self) -> Result<(String, Uuid)> {
        let email = "admin@example.com";
        let (_, id) = self.register("Admin", email).await?;
        let role = roles::ensure(&self.pool, &RoleInput::admin()).await?;
        self.set_role(id, role.id).await?;
        Ok((self.login(email).await?, id))
    }

    pub async fn set_role(&self, user_id: Uuid, role_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET role_id = ? WHERE id = ?")
            .bind(role_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_project(&self, token: &str, title: &str, assigned: &[Uuid]) -> Result<Uuid> {
        let (status, body) = self
            .send(
                "POST",
                "/projects",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": format!("{title} description"),
                    "deadline": "2030-01-01T00:00:00Z",
                    "environment_keys": "<p>API_KEY=secret</p>",
                    "assigned_users": assigned,
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {body}");
        Ok(id_of(&body))
    }

    pub async fn create_task(&self, token: &str, project_id: Uuid, assignee: Uuid, title: &str) -> Result<Uuid> {
        let (status, body) = self
            .send(
                "POST",
                "/tasks",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": format!("{title} description"),
                    "project_id": project_id,
                    "assigned_to": assignee,
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {body}");
        Ok(id_of(&body))
    }
}

pub fn token_of(body: &Value) -> String {
    body["token"].as_str().expect("token in auth response").to_string()
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("id in response body")
}

pub fn ids_of(body: &Value) -> Vec<Uuid> {
    body.as_array()
        .expect("array response")
        .iter()
        .map(id_of)
        .collect()
}
