mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn non_admin_sees_only_assigned_projects() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (alice, alice_id) = t.register("Alice", "alice@example.com").await?;
    let (_, bob_id) = t.register("Bob", "bob@example.com").await?;

    let p = t.create_project(&admin, "P", &[alice_id]).await?;
    let q = t.create_project(&admin, "Q", &[bob_id]).await?;

    // Alice's default role grants projects:read, which does not widen the list.
    let (status, body) = t.get("/projects", &alice).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(common::ids_of(&body), vec![p]);
    assert!(body[0].get("environment_keys").is_none(), "blob leaked: {body}");

    // Asking for someone else's projects is ignored for non-admins.
    let (_, body) = t.get(&format!("/projects?user_id={bob_id}"), &alice).await?;
    assert_eq!(common::ids_of(&body), vec![p]);

    let (status, _) = t.get(&format!("/projects/{q}"), &alice).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.get(&format!("/projects/{p}"), &alice).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assigned_users"][0]["id"], alice_id.to_string());

    Ok(())
}

#[tokio::test]
async fn admin_sees_everything_and_may_filter_by_user() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (_, alice_id) = t.register("Alice", "alice@example.com").await?;
    let (_, bob_id) = t.register("Bob", "bob@example.com").await?;

    let p = t.create_project(&admin, "P", &[alice_id]).await?;
    let q = t.create_project(&admin, "Q", &[bob_id]).await?;

    let (_, body) = t.get("/projects", &admin).await?;
    assert_eq!(common::ids_of(&body), vec![q, p], "newest first");
    assert_eq!(body[0]["environment_keys"], "<p>API_KEY=secret</p>");

    let (_, body) = t.get(&format!("/projects?user_id={bob_id}"), &admin).await?;
    assert_eq!(common::ids_of(&body), vec![q]);

    Ok(())
}

#[tokio::test]
async fn create_requires_permission_and_valid_assignment() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (alice, alice_id) = t.register("Alice", "alice@example.com").await?;

    let payload = json!({
        "title": "Side project",
        "description": "d",
        "deadline": "2030-01-01T00:00:00Z",
        "assigned_users": [alice_id],
    });
    let (status, body) = t.send("POST", "/projects", Some(&alice), Some(payload)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = t
        .send(
            "POST",
            "/projects",
            Some(&admin),
            Some(json!({
                "title": "No one",
                "description": "d",
                "deadline": "2030-01-01T00:00:00Z",
                "assigned_users": [],
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "empty assignment");

    let (status, _) = t
        .send(
            "POST",
            "/projects",
            Some(&admin),
            Some(json!({
                "title": "Ghost",
                "description": "d",
                "deadline": "2030-01-01T00:00:00Z",
                "assigned_users": [Uuid::new_v4()],
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unknown assignee");

    let (status, body) = t
        .send(
            "POST",
            "/projects",
            Some(&admin),
            Some(json!({
                "title": "Real",
                "description": "d",
                "deadline": "2030-01-01T00:00:00Z",
                "assigned_users": [alice_id, alice_id],
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "not-started");
    assert_eq!(body["assigned_users"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn update_replaces_fields_and_assignment() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (alice, alice_id) = t.register("Alice", "alice@example.com").await?;
    let (_, bob_id) = t.register("Bob", "bob@example.com").await?;
    let p = t.create_project(&admin, "P", &[alice_id]).await?;

    let payload = json!({
        "title": "P v2",
        "description": "updated",
        "deadline": "2031-06-01T00:00:00Z",
        "status": "in-progress",
        "assigned_users": [bob_id],
    });

    let (status, _) = t.send("PUT", &format!("/projects/{p}"), Some(&alice), Some(payload.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "projects:update not granted");

    let (status, body) = t.send("PUT", &format!("/projects/{p}"), Some(&admin), Some(payload.clone())).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "P v2");
    assert_eq!(body["status"], "in-progress");
    assert_eq!(body["environment_keys"], "<p>API_KEY=secret</p>", "blob kept when omitted");

    let (_, body) = t.get("/projects", &alice).await?;
    assert!(common::ids_of(&body).is_empty(), "alice was unassigned");

    let (status, _) = t
        .send("PUT", &format!("/projects/{}", Uuid::new_v4()), Some(&admin), Some(payload))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn deleting_a_project_removes_its_tasks() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (alice, alice_id) = t.register("Alice", "alice@example.com").await?;
    let p = t.create_project(&admin, "P", &[alice_id]).await?;
    let other = t.create_project(&admin, "Other", &[alice_id]).await?;

    let t1 = t.create_task(&admin, p, alice_id, "one").await?;
    t.create_task(&admin, p, alice_id, "two").await?;
    let kept = t.create_task(&admin, other, alice_id, "kept").await?;

    let (status, _) = t.send("DELETE", &format!("/projects/{p}"), Some(&alice), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.send("DELETE", &format!("/projects/{p}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project deleted successfully");

    let (status, _) = t.get(&format!("/projects/{p}"), &admin).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.get(&format!("/tasks/{t1}"), &admin).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_id = ?")
        .bind(p.to_string())
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(remaining, 0);

    let (_, body) = t.get("/tasks", &admin).await?;
    assert_eq!(common::ids_of(&body), vec![kept]);

    let (status, _) = t.send("DELETE", &format!("/projects/{p}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn unauthorized_create_does_not_reveal_unknown_users() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (alice, alice_id) = t.register("Alice", "alice@example.com").await?;
    let p = t.create_project(&admin, "P", &[alice_id]).await?;

    let payload = json!({
        "title": "Ghost",
        "description": "d",
        "deadline": "2030-01-01T00:00:00Z",
        "assigned_users": [Uuid::new_v4()],
    });

    let (status, body) = t.send("POST", "/projects", Some(&alice), Some(payload.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = t.send("PUT", &format!("/projects/{p}"), Some(&alice), Some(payload)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    Ok(())
}
