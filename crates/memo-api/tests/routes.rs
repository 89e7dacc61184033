use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use memo_api::auth::{AppState, AppStateInner};

const SECRET: &str = "test-secret";

fn app() -> Router {
    app_with_state().0
}

fn app_with_state() -> (Router, AppState) {
    let db = memo_db::Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: SECRET.into(),
    });
    (memo_api::router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    let req = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register a user and return (user_id, token).
async fn register(app: &Router, email: &str, password: &str, username: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": password, "username": username })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let app = app();
    let (user_id, token) = register(&app, "a@x.com", "secret1", "Alice").await;

    // the issued token resolves back to the same user
    let verified = memo_api::token::verify(SECRET, &token).unwrap();
    assert_eq!(verified.to_string(), user_id);

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"].as_str().unwrap(), user_id);
    assert_eq!(body["user"]["username"], "Alice");
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn weak_or_missing_registration_input_is_rejected() {
    let app = app();

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "a@x.com", "password": "short", "username": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "a@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // five multibyte characters are still five characters, whatever their
    // byte length
    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "a@x.com", "password": "암호암호암", "username": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // neither attempt persisted a row
    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // six multibyte characters clear the minimum
    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "a@x.com", "password": "암호암호암호", "username": "Alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn duplicate_email_registration_conflicts() {
    let app = app();
    register(&app, "a@x.com", "secret1", "Alice").await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "email": "a@x.com", "password": "secret2", "username": "Alice2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = app();
    register(&app, "a@x.com", "secret1", "Alice").await;

    let (wrong_pw_status, wrong_pw_body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong" })),
    )
    .await;
    let (no_user_status, no_user_body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "whatever" })),
    )
    .await;

    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(no_user_status, StatusCode::UNAUTHORIZED);
    // identical payloads, so the response cannot enumerate accounts
    assert_eq!(wrong_pw_body, no_user_body);
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let app = app();

    let (status, _) = send(&app, "GET", "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (user_id, token) = register(&app, "a@x.com", "secret1", "Alice").await;
    let (status, body) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"].as_str().unwrap(), user_id);
    assert_eq!(body["user"]["email"], "a@x.com");
}

#[tokio::test]
async fn group_lifecycle_enforces_ownership() {
    let app = app();
    let (alice_id, alice) = register(&app, "a@x.com", "secret1", "Alice").await;
    let (_, bob) = register(&app, "b@x.com", "secret1", "Bob").await;

    // creation requires auth and a name
    let (status, _) = send(&app, "POST", "/groups", None, Some(json!({ "name": "Team" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "POST", "/groups", Some(&alice), Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&alice),
        Some(json!({ "name": "Team" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = body["group"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["group"]["owner_id"].as_str().unwrap(), alice_id);

    // alice sees the group with her owner membership
    let (status, body) = send(&app, "GET", "/groups", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groups"].as_array().unwrap().len(), 1);
    assert_eq!(body["groups"][0]["my_role"], "owner");
    assert_eq!(body["groups"][0]["member_count"], 1);
    assert_eq!(body["groups"][0]["owner_name"], "Alice");

    // bob is not a member and may not delete
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/groups/{}", group_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the owner may
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/groups/{}", group_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/groups", Some(&alice), None).await;
    assert_eq!(body["groups"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn member_role_does_not_permit_group_delete() {
    let (app, state) = app_with_state();
    let (_, alice) = register(&app, "a@x.com", "secret1", "Alice").await;
    let (bob_id, bob) = register(&app, "b@x.com", "secret1", "Bob").await;

    let (status, body) = send(
        &app,
        "POST",
        "/groups",
        Some(&alice),
        Some(json!({ "name": "Team" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = body["group"]["id"].as_str().unwrap().to_string();

    // seed bob as a plain member (joining runs through an invite flow the
    // API does not expose)
    state
        .db
        .with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_members (id, group_id, user_id, role)
                 VALUES (?1, ?2, ?3, 'member')",
                (uuid::Uuid::new_v4().to_string(), group_id.as_str(), bob_id.as_str()),
            )?;
            Ok(())
        })
        .unwrap();

    // bob now belongs to the group and sees it, but still may not delete it
    let (status, body) = send(&app, "GET", "/groups", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groups"][0]["my_role"], "member");
    assert_eq!(body["groups"][0]["member_count"], 2);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/groups/{}", group_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the group survived the attempt
    let (_, body) = send(&app, "GET", "/groups", Some(&alice), None).await;
    assert_eq!(body["groups"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn memo_crud_trims_and_returns_deleted_record() {
    let app = app();

    let (status, _) = send(&app, "POST", "/memos", None, Some(json!({ "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/memos",
        None,
        Some(json!({ "content": "  hello  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "hello");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", &format!("/memos/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "hello");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/memos/{}", id),
        None,
        Some(json!({ "content": "\t\n" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/memos/{}", id),
        None,
        Some(json!({ "content": " changed " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "changed");

    let (status, body) = send(&app, "DELETE", &format!("/memos/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["memo"]["content"], "changed");

    let (status, _) = send(&app, "GET", &format!("/memos/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/memos/{}", missing),
        None,
        Some(json!({ "content": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn memo_author_is_recorded_when_a_token_is_present() {
    let app = app();
    let (alice_id, alice) = register(&app, "a@x.com", "secret1", "Alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/memos",
        Some(&alice),
        Some(json!({ "content": "signed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"].as_str().unwrap(), alice_id);

    // anonymous creation still works, author stays null
    let (status, body) = send(
        &app,
        "POST",
        "/memos",
        None,
        Some(json!({ "content": "anonymous" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["user_id"].is_null());
}

#[tokio::test]
async fn memo_list_is_newest_first() {
    let app = app();
    for content in ["first", "second", "third"] {
        let (status, _) = send(
            &app,
            "POST",
            "/memos",
            None,
            Some(json!({ "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", "/memos", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["third", "second", "first"]);
}
