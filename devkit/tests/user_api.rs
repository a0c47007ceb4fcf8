use axum::http::{Method, StatusCode};
use devicehub_devkit::test_utils::{ALICE, ALICE_KEY, BOB, BOB_KEY};
use devicehub_devkit::TestHarness;
use serde_json::{json, Value};

#[tokio::test]
async fn test_registration_returns_usable_key() {
    let harness = TestHarness::new();
    let body = json!({ "email": "Dana@DeviceHub.test", "firstName": "Dana", "lastName": "Moreau" });
    let created = harness.send(Method::POST, "/users", None, Some(body.clone())).await.unwrap();
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.field("_id"), Some(&json!("dana@devicehub.test")));
    let key = created.field("apiKey").and_then(Value::as_str).unwrap().to_string();

    let projects = harness.get("/projects", &key).await.unwrap();
    assert_eq!(projects.status, StatusCode::OK);

    let duplicate = harness.send(Method::POST, "/users", None, Some(body)).await.unwrap();
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.detail(), Some("A user with this email already exists"));
}

#[tokio::test]
async fn test_invalid_registration() {
    let harness = TestHarness::new();
    let bad_email = json!({ "email": "nope", "firstName": "Dana", "lastName": "Moreau" });
    let response = harness.send(Method::POST, "/users", None, Some(bad_email)).await.unwrap();
    assert_eq!(response.status, StatusCode::CONFLICT);

    let missing = json!({ "email": "dana@devicehub.test" });
    let response = harness.send(Method::POST, "/users", None, Some(missing)).await.unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_key_is_required() {
    let harness = TestHarness::new();

    let missing = harness.send(Method::GET, "/projects", None, None).await.unwrap();
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.detail(), Some("Not logged in"));

    let wrong = harness.get("/projects", "not-a-key").await.unwrap();
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let listing = harness.send(Method::GET, "/users", None, None).await.unwrap();
    assert_eq!(listing.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_views_hide_api_keys() {
    let harness = TestHarness::new();
    let users = harness.get("/users", ALICE_KEY).await.unwrap();
    assert_eq!(users.status, StatusCode::OK);
    let entries = users.body.as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|u| u.get("apiKey").is_none()));

    let bob = harness.get(&format!("/users/{BOB}"), ALICE_KEY).await.unwrap();
    assert_eq!(bob.field("firstName"), Some(&json!("Bob")));
    assert!(bob.field("apiKey").is_none());
}

#[tokio::test]
async fn test_users_delete_only_themselves() {
    let harness = TestHarness::new();
    let project = harness.create_project(ALICE_KEY, "Lab", &[BOB]).await.unwrap();

    let denied = harness.delete(&format!("/users/{ALICE}"), BOB_KEY).await.unwrap();
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    assert_eq!(harness.delete(&format!("/users/{BOB}"), BOB_KEY).await.unwrap().status, StatusCode::OK);
    assert_eq!(harness.get("/projects", BOB_KEY).await.unwrap().status, StatusCode::UNAUTHORIZED);

    let project_view = harness.get(&format!("/projects/{project}"), ALICE_KEY).await.unwrap();
    assert_eq!(project_view.field("users"), Some(&json!([])));
}
