use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use roomsense::api::AppState;
use roomsense::config::Config;
use tower::ServiceExt;

/// The migration seeds a dev account with this id and password.
const DEV_ID: i32 = 1;
const DEV_EMAIL: &str = "dev@roomsense.local";
const DEV_PASSWORD: &str = "password";

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();
    // A single connection keeps the in-memory database shared.
    config.database.max_connections = 1;
    config.database.min_connections = 1;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = roomsense::api::create_app_state(config, None)
        .await
        .expect("Failed to create app state");

    (roomsense::api::router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user_id: Option<i32>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// Registers a user and returns their id.
async fn register_user(app: &Router, username: &str, email: &str) -> i32 {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": username,
            "email": email,
            "password": "hunter2hunter2",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["data"]["id"].as_i64().unwrap() as i32
}

#[tokio::test]
async fn test_register_and_login() {
    let (app, _state) = spawn_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "correct-horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "user");
    assert_eq!(body["data"]["is_admin"], false);
    assert_eq!(body["data"]["is_dev"], false);

    // Duplicate email is a conflict.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "correct-horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Wrong password and unknown email are indistinguishable.
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": "alice@example.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": "nobody@example.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": "alice@example.com", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn test_seeded_dev_account() {
    let (app, _state) = spawn_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": DEV_EMAIL, "password": DEV_PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], DEV_ID);
    assert_eq!(body["data"]["role"], "dev");
    assert_eq!(body["data"]["is_admin"], true);
    assert_eq!(body["data"]["is_dev"], true);
    assert_eq!(body["data"]["must_change_password"], true);
}

#[tokio::test]
async fn test_identity_header_resolution() {
    let (app, _state) = spawn_app().await;

    // No header, unparsable header, and unknown id all resolve to no
    // requester.
    let (status, _) = send(&app, "GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/me")
        .header("x-user-id", "not-a-number")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/me", Some(9999), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/me", Some(DEV_ID), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], DEV_EMAIL);
}

#[tokio::test]
async fn test_admin_and_dev_gates() {
    let (app, _state) = spawn_app().await;
    let user_id = register_user(&app, "bob", "bob@example.com").await;

    let (status, _) = send(&app, "GET", "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/users", Some(user_id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/users", Some(DEV_ID), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/system/health", Some(user_id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/system/health", Some(DEV_ID), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "ok");
    assert!(body["data"]["users"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_role_mutation_is_dev_exclusive() {
    let (app, _state) = spawn_app().await;
    let target_id = register_user(&app, "carol", "carol@example.com").await;

    // Dev promotes an admin for the test.
    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(DEV_ID),
        Some(serde_json::json!({
            "username": "admin",
            "email": "admin@example.com",
            "password": "adminadmin1",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let admin_id = body["data"]["id"].as_i64().unwrap() as i32;
    assert_eq!(body["data"]["is_admin"], true);
    assert_eq!(body["data"]["must_change_password"], true);

    // An admin cannot change roles, even to the same value.
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/users/{target_id}"),
        Some(admin_id),
        Some(serde_json::json!({"role": "user"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An admin cannot invite an admin or dev.
    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(admin_id),
        Some(serde_json::json!({
            "username": "sneaky",
            "email": "sneaky@example.com",
            "password": "sneakysneak1",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An admin can invite a plain user.
    let (status, _) = send(
        &app,
        "POST",
        "/api/users",
        Some(admin_id),
        Some(serde_json::json!({
            "username": "plain",
            "email": "plain@example.com",
            "password": "plainplain1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Dev can change roles.
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/users/{target_id}"),
        Some(DEV_ID),
        Some(serde_json::json!({"role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["is_admin"], true);
    assert_eq!(body["data"]["is_dev"], false);
}

#[tokio::test]
async fn test_delete_user_rules() {
    let (app, _state) = spawn_app().await;
    let target_id = register_user(&app, "dora", "dora@example.com").await;

    // Deleting users is dev-only.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{DEV_ID}"),
        Some(target_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Self-delete through the administration route is always invalid.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{DEV_ID}"),
        Some(DEV_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{target_id}"),
        Some(DEV_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/users/{target_id}"),
        Some(DEV_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_claim_flow() {
    let (app, _state) = spawn_app().await;
    let alice_id = register_user(&app, "alice", "alice@example.com").await;
    let bob_id = register_user(&app, "bob", "bob@example.com").await;

    // Controller creation is admin-only and issues a pairing code.
    let (status, _) = send(
        &app,
        "POST",
        "/api/controllers",
        Some(alice_id),
        Some(serde_json::json!({"device_id": "room-a"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/api/controllers",
        Some(DEV_ID),
        Some(serde_json::json!({"device_id": "room-a", "label": "Living room"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = body["data"]["pairing_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 5);
    assert!(code.bytes().all(|b| b.is_ascii_digit()));

    // Duplicate device id conflicts.
    let (status, _) = send(
        &app,
        "POST",
        "/api/controllers",
        Some(DEV_ID),
        Some(serde_json::json!({"device_id": "room-a"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Claiming requires an authenticated requester.
    let (status, _) = send(
        &app,
        "POST",
        "/api/claim",
        None,
        Some(serde_json::json!({"code": code})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Malformed codes are rejected before any lookup.
    for bad in ["12", "abcde", "123456", ""] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/claim",
            Some(alice_id),
            Some(serde_json::json!({"code": bad})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "code {bad:?}");
    }

    // A well-formed but unknown code is not-found.
    let wrong = if code == "12345" { "54321" } else { "12345" };
    let (status, _) = send(
        &app,
        "POST",
        "/api/claim",
        Some(alice_id),
        Some(serde_json::json!({"code": wrong})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/claim",
        Some(alice_id),
        Some(serde_json::json!({"code": code, "label": "Mine"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "claim failed: {body}");
    assert_eq!(body["data"]["controller"]["device_id"], "room-a");
    assert_eq!(body["data"]["label"], "Mine");

    // Claiming the same code twice as the same user is a conflict.
    let (status, _) = send(
        &app,
        "POST",
        "/api/claim",
        Some(alice_id),
        Some(serde_json::json!({"code": code})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A different user may claim the same controller.
    let (status, _) = send(
        &app,
        "POST",
        "/api/claim",
        Some(bob_id),
        Some(serde_json::json!({"code": code})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/users/{alice_id}/controllers"),
        Some(alice_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["label"], "Mine");
}

#[tokio::test]
async fn test_pairing_codes_unique_among_unclaimed() {
    let (app, _state) = spawn_app().await;

    let mut codes = std::collections::HashSet::new();
    for i in 0..30 {
        let (status, body) = send(
            &app,
            "POST",
            "/api/controllers",
            Some(DEV_ID),
            Some(serde_json::json!({"device_id": format!("dev-{i}")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let code = body["data"]["pairing_code"].as_str().unwrap().to_string();
        assert!(codes.insert(code), "pairing code issued twice");
    }
}

#[tokio::test]
async fn test_assignment_management() {
    let (app, _state) = spawn_app().await;
    let alice_id = register_user(&app, "alice", "alice@example.com").await;
    let bob_id = register_user(&app, "bob", "bob@example.com").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/controllers",
        Some(DEV_ID),
        Some(serde_json::json!({"device_id": "room-b"})),
    )
    .await;
    let controller_id = body["data"]["id"].as_i64().unwrap() as i32;

    // Direct assignment is admin-only.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/users/{alice_id}/controllers"),
        Some(alice_id),
        Some(serde_json::json!({"controller_id": controller_id})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/users/{alice_id}/controllers"),
        Some(DEV_ID),
        Some(serde_json::json!({"controller_id": controller_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Re-assignment is rejected, not duplicated.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/users/{alice_id}/controllers"),
        Some(DEV_ID),
        Some(serde_json::json!({"controller_id": controller_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Owners can relabel their own assignments; strangers cannot.
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/users/{alice_id}/controllers/{controller_id}"),
        Some(bob_id),
        Some(serde_json::json!({"label": "Stolen"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/users/{alice_id}/controllers/{controller_id}"),
        Some(alice_id),
        Some(serde_json::json!({"label": "Bedroom"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["label"], "Bedroom");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{alice_id}/controllers/{controller_id}"),
        Some(alice_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/users/{alice_id}/controllers"),
        Some(alice_id),
        None,
    )
    .await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_change_password_clears_rotation_flag() {
    let (app, _state) = spawn_app().await;

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/me/password",
        Some(DEV_ID),
        Some(serde_json::json!({
            "current_password": "wrong",
            "new_password": "a-new-password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/me/password",
        Some(DEV_ID),
        Some(serde_json::json!({
            "current_password": DEV_PASSWORD,
            "new_password": "a-new-password",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["must_change_password"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": DEV_EMAIL, "password": "a-new-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_audit_listing_and_purge() {
    let (app, state) = spawn_app().await;
    let user_id = register_user(&app, "eve", "eve@example.com").await;

    // The registration above recorded an entry.
    let (status, body) = send(&app, "GET", "/api/audit", Some(DEV_ID), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["pagination"]["total"].as_u64().unwrap() >= 1);

    let (status, _) = send(&app, "GET", "/api/audit", Some(user_id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Purge needs exactly one of `all` / `before`.
    let (status, _) = send(
        &app,
        "DELETE",
        "/api/audit",
        Some(DEV_ID),
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/audit",
        Some(DEV_ID),
        Some(serde_json::json!({"all": true, "before": "2026-01-01T00:00:00Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/audit",
        Some(DEV_ID),
        Some(serde_json::json!({"before": "not a timestamp"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/audit",
        Some(user_id),
        Some(serde_json::json!({"all": true})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Cutoff scenario: one entry before the cutoff, two after.
    let (status, _) = send(
        &app,
        "DELETE",
        "/api/audit",
        Some(DEV_ID),
        Some(serde_json::json!({"all": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // purge-all records its own trail entry; clear it out of the way by
    // counting from here.
    let (_, body) = send(&app, "GET", "/api/audit", Some(DEV_ID), None).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);

    let cutoff = chrono::Utc::now().to_rfc3339();

    state
        .store
        .append_audit(None, "system.test", "test", Some("t1"), None, None)
        .await
        .unwrap();
    state
        .store
        .append_audit(None, "system.test", "test", Some("t2"), None, None)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "DELETE",
        "/api/audit",
        Some(DEV_ID),
        Some(serde_json::json!({"before": cutoff})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Only the earlier purge record predates the cutoff.
    assert_eq!(body["data"], 1);

    let (_, body) = send(
        &app,
        "GET",
        "/api/audit?action=system.test",
        Some(DEV_ID),
        None,
    )
    .await;
    assert_eq!(body["data"]["pagination"]["total"], 2);
    let entries = body["data"]["entries"].as_array().unwrap();
    // Newest first.
    assert_eq!(entries[0]["entity_id"], "t2");
    assert_eq!(entries[1]["entity_id"], "t1");
}

#[tokio::test]
async fn test_purge_cutoff_in_non_utc_offset() {
    let (app, state) = spawn_app().await;

    state
        .store
        .append_audit(None, "system.test", "test", Some("fresh"), None, None)
        .await
        .unwrap();

    // A cutoff one hour in the past, expressed in +02:00. Its string
    // rendering sorts after the stored UTC timestamps, so without
    // normalization it would wrongly sweep up the entry appended above.
    let offset = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
    let cutoff = (chrono::Utc::now() - chrono::Duration::hours(1))
        .with_timezone(&offset)
        .to_rfc3339();

    let (status, body) = send(
        &app,
        "DELETE",
        "/api/audit",
        Some(DEV_ID),
        Some(serde_json::json!({"before": cutoff})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], 0);

    let (_, body) = send(
        &app,
        "GET",
        "/api/audit?action=system.test",
        Some(DEV_ID),
        None,
    )
    .await;
    assert_eq!(body["data"]["pagination"]["total"], 1);

    // The same cutoff an hour in the future sweeps both the entry and
    // the trail record of the first purge.
    let cutoff = (chrono::Utc::now() + chrono::Duration::hours(1))
        .with_timezone(&offset)
        .to_rfc3339();

    let (status, body) = send(
        &app,
        "DELETE",
        "/api/audit",
        Some(DEV_ID),
        Some(serde_json::json!({"before": cutoff})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], 2);
}

#[tokio::test]
async fn test_metrics_endpoint_without_recorder() {
    let (app, _state) = spawn_app().await;

    let (status, _) = send(&app, "GET", "/api/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
