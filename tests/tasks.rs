mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;

/// Creates a role with read-only grants and rebinds `user_id` to it.
async fn make_viewer(t: &TestApp, admin: &str, user_id: Uuid, email: &str) -> Result<String> {
    let (status, body) = t
        .send(
            "POST",
            "/roles",
            Some(admin),
            Some(json!({
                "name": "Viewer",
                "description": "Read only",
                "permissions": [
                    { "resource": "projects", "actions": ["read"] },
                    { "resource": "tasks", "actions": ["read"] }
                ]
            })),
        )
        .await?;
    let role_id = if status == StatusCode::CREATED {
        common::id_of(&body)
    } else {
        assert_eq!(status, StatusCode::CONFLICT, "unexpected: {body}");
        let (_, roles) = t.get("/roles", admin).await?;
        roles
            .as_array()
            .and_then(|all| all.iter().find(|r| r["name"] == "Viewer"))
            .map(common::id_of)
            .expect("viewer role listed")
    };

    let (status, body) = t
        .send("PATCH", &format!("/users/{user_id}"), Some(admin), Some(json!({ "role_id": role_id })))
        .await?;
    assert_eq!(status, StatusCode::OK, "role change failed: {body}");

    t.login(email).await
}

#[tokio::test]
async fn assignee_cycles_status_without_update_permission() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (_, alice_id) = t.register("Alice", "alice@example.com").await?;
    let (_, bob_id) = t.register("Bob", "bob@example.com").await?;
    let alice = make_viewer(&t, &admin, alice_id, "alice@example.com").await?;
    let bob = make_viewer(&t, &admin, bob_id, "bob@example.com").await?;

    let p = t.create_project(&admin, "P", &[alice_id, bob_id]).await?;
    let task = t.create_task(&admin, p, alice_id, "write docs").await?;

    for status in ["completed", "in-progress", "not-started", "completed"] {
        let (code, body) = t
            .send("PATCH", &format!("/tasks/{task}"), Some(&alice), Some(json!({ "status": status })))
            .await?;
        assert_eq!(code, StatusCode::OK, "assignee could not set {status}: {body}");
        assert_eq!(body["status"], status);
    }

    let (code, _) = t
        .send("PATCH", &format!("/tasks/{task}"), Some(&bob), Some(json!({ "status": "in-progress" })))
        .await?;
    assert_eq!(code, StatusCode::FORBIDDEN, "non-assignee without tasks:update");

    let (code, _) = t
        .send(
            "PUT",
            &format!("/tasks/{task}"),
            Some(&alice),
            Some(json!({
                "title": "renamed",
                "description": "d",
                "status": "completed",
                "assigned_to": alice_id,
            })),
        )
        .await?;
    assert_eq!(code, StatusCode::FORBIDDEN, "full update needs tasks:update");

    let (code, _) = t
        .send("PATCH", &format!("/tasks/{task}"), Some(&alice), Some(json!({})))
        .await?;
    assert_eq!(code, StatusCode::BAD_REQUEST, "status is required");

    Ok(())
}

#[tokio::test]
async fn default_role_holder_may_update_any_task_status() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (_, alice_id) = t.register("Alice", "alice@example.com").await?;
    let (bob, bob_id) = t.register("Bob", "bob@example.com").await?;

    let p = t.create_project(&admin, "P", &[alice_id, bob_id]).await?;
    let task = t.create_task(&admin, p, alice_id, "alice's").await?;

    // The default role carries tasks:update.
    let (code, body) = t
        .send("PATCH", &format!("/tasks/{task}"), Some(&bob), Some(json!({ "status": "in-progress" })))
        .await?;
    assert_eq!(code, StatusCode::OK, "{body}");

    Ok(())
}

#[tokio::test]
async fn task_list_and_detail_are_scoped_to_assignee() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (alice, alice_id) = t.register("Alice", "alice@example.com").await?;
    let (_, bob_id) = t.register("Bob", "bob@example.com").await?;

    let p = t.create_project(&admin, "P", &[alice_id, bob_id]).await?;
    let q = t.create_project(&admin, "Q", &[alice_id]).await?;
    let mine = t.create_task(&admin, p, alice_id, "mine").await?;
    let theirs = t.create_task(&admin, p, bob_id, "theirs").await?;
    let mine_in_q = t.create_task(&admin, q, alice_id, "mine in q").await?;

    let (_, body) = t.get("/tasks", &alice).await?;
    assert_eq!(common::ids_of(&body), vec![mine_in_q, mine]);

    let (_, body) = t.get(&format!("/tasks?project_id={p}"), &alice).await?;
    assert_eq!(common::ids_of(&body), vec![mine]);
    assert_eq!(body[0]["project"]["title"], "P");
    assert_eq!(body[0]["assigned_to"]["email"], "alice@example.com");

    let (_, body) = t.get(&format!("/tasks?user_id={bob_id}"), &alice).await?;
    assert_eq!(common::ids_of(&body), vec![mine_in_q, mine], "user_id ignored for non-admin");

    let (_, body) = t.get(&format!("/tasks?project_id={p}&user_id={bob_id}"), &admin).await?;
    assert_eq!(common::ids_of(&body), vec![theirs]);

    let (code, _) = t.get(&format!("/tasks/{theirs}"), &alice).await?;
    assert_eq!(code, StatusCode::FORBIDDEN);
    let (code, _) = t.get(&format!("/tasks/{mine}"), &alice).await?;
    assert_eq!(code, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn create_update_and_delete_by_admin() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (alice, alice_id) = t.register("Alice", "alice@example.com").await?;
    let (_, bob_id) = t.register("Bob", "bob@example.com").await?;
    let p = t.create_project(&admin, "P", &[alice_id]).await?;

    let (code, _) = t
        .send(
            "POST",
            "/tasks",
            Some(&admin),
            Some(json!({ "title": "x", "description": "d", "project_id": Uuid::new_v4(), "assigned_to": alice_id })),
        )
        .await?;
    assert_eq!(code, StatusCode::NOT_FOUND, "unknown project");

    let (code, _) = t
        .send(
            "POST",
            "/tasks",
            Some(&admin),
            Some(json!({ "title": "x", "description": "d", "project_id": p, "assigned_to": Uuid::new_v4() })),
        )
        .await?;
    assert_eq!(code, StatusCode::BAD_REQUEST, "unknown assignee");

    let (code, _) = t
        .send(
            "POST",
            "/tasks",
            Some(&alice),
            Some(json!({ "title": "x", "description": "d", "project_id": p, "assigned_to": alice_id })),
        )
        .await?;
    assert_eq!(code, StatusCode::FORBIDDEN, "tasks:create not granted");

    let task = t.create_task(&admin, p, alice_id, "original").await?;
    let (code, body) = t
        .send(
            "PUT",
            &format!("/tasks/{task}"),
            Some(&admin),
            Some(json!({ "title": "reassigned", "description": "d2", "status": "in-progress", "assigned_to": bob_id })),
        )
        .await?;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["title"], "reassigned");
    assert_eq!(body["assigned_to"]["id"], bob_id.to_string());

    let (code, _) = t.send("DELETE", &format!("/tasks/{task}"), Some(&alice), None).await?;
    assert_eq!(code, StatusCode::FORBIDDEN);
    let (code, _) = t.send("DELETE", &format!("/tasks/{task}"), Some(&admin), None).await?;
    assert_eq!(code, StatusCode::OK);
    let (code, _) = t.get(&format!("/tasks/{task}"), &admin).await?;
    assert_eq!(code, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn unauthorized_create_does_not_reveal_missing_records() -> Result<()> {
    let t = common::setup().await?;
    let (admin, _) = t.admin().await?;
    let (alice, alice_id) = t.register("Alice", "alice@example.com").await?;
    let p = t.create_project(&admin, "P", &[alice_id]).await?;
    let task = t.create_task(&admin, p, alice_id, "one").await?;

    let (code, _) = t
        .send(
            "POST",
            "/tasks",
            Some(&alice),
            Some(json!({ "title": "x", "description": "d", "project_id": Uuid::new_v4(), "assigned_to": alice_id })),
        )
        .await?;
    assert_eq!(code, StatusCode::FORBIDDEN, "missing project");

    let (code, _) = t
        .send(
            "POST",
            "/tasks",
            Some(&alice),
            Some(json!({ "title": "x", "description": "d", "project_id": p, "assigned_to": Uuid::new_v4() })),
        )
        .await?;
    assert_eq!(code, StatusCode::FORBIDDEN, "unknown assignee");

    // A User-role caller holds tasks:update, so the existence check still answers.
    let (code, _) = t
        .send(
            "PUT",
            &format!("/tasks/{task}"),
            Some(&alice),
            Some(json!({ "title": "y", "description": "d", "status": "in-progress", "assigned_to": Uuid::new_v4() })),
        )
        .await?;
    assert_eq!(code, StatusCode::BAD_REQUEST);

    let (_, bob_id) = t.register("Bob", "bob@example.com").await?;
    let viewer = make_viewer(&t, &admin, bob_id, "bob@example.com").await?;
    let (code, _) = t
        .send(
            "PUT",
            &format!("/tasks/{task}"),
            Some(&viewer),
            Some(json!({ "title": "y", "description": "d", "status": "in-progress", "assigned_to": Uuid::new_v4() })),
        )
        .await?;
    assert_eq!(code, StatusCode::FORBIDDEN);

    Ok(())
}
