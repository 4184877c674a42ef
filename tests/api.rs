use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use tower::ServiceExt;

use courier::{
    api::{create_router, AppState},
    auth,
    config::Config,
    db::{MessageRepository, NewUser, UserRepository},
    error::AppError,
};

const SECRET: &str = "test-secret";
const WORK_FACTOR: u32 = 1;

fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: "sqlite::memory:".to_string(),
        secret_key: SECRET.to_string(),
        hash_work_factor: WORK_FACTOR,
        db_max_connections: 1,
        db_min_connections: 1,
        request_timeout_secs: 5,
    }
}

async fn setup() -> (Router, Pool<Sqlite>) {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let state = AppState {
        db: pool.clone(),
        config: Arc::new(test_config()),
    };

    (create_router(state), pool)
}

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        password: "secret".to_string(),
        first_name: "A".to_string(),
        last_name: "L".to_string(),
        phone: "555".to_string(),
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "password": "secret",
            "first_name": "A",
            "last_name": "L",
            "phone": "555",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().expect("token in response").to_string()
}

#[tokio::test]
async fn authenticate_checks_password() {
    let (_app, pool) = setup().await;

    UserRepository::register(&pool, new_user("alice"), WORK_FACTOR)
        .await
        .unwrap();

    assert!(UserRepository::authenticate(&pool, "alice", "secret")
        .await
        .unwrap());
    assert!(!UserRepository::authenticate(&pool, "alice", "wrong")
        .await
        .unwrap());
    assert!(matches!(
        UserRepository::authenticate(&pool, "nobody", "secret").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn duplicate_registration_leaves_one_row() {
    let (_app, pool) = setup().await;

    UserRepository::register(&pool, new_user("alice"), WORK_FACTOR)
        .await
        .unwrap();
    let second = UserRepository::register(&pool, new_user("alice"), WORK_FACTOR).await;

    assert!(matches!(second, Err(AppError::DuplicateUsername(_))));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind("alice")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn mark_read_is_repeatable() {
    let (_app, pool) = setup().await;

    UserRepository::register(&pool, new_user("alice"), WORK_FACTOR)
        .await
        .unwrap();
    UserRepository::register(&pool, new_user("bob"), WORK_FACTOR)
        .await
        .unwrap();

    let message = MessageRepository::create(&pool, "alice", "bob", "hi")
        .await
        .unwrap();
    assert!(message.read_at.is_none());

    let first = MessageRepository::mark_read(&pool, &message.id).await.unwrap();
    let second = MessageRepository::mark_read(&pool, &message.id).await.unwrap();

    // The first call fixes the timestamp; repeats keep it.
    assert_eq!(first.read_at, second.read_at);
}

#[tokio::test]
async fn create_message_rejects_unknown_recipient() {
    let (_app, pool) = setup().await;

    UserRepository::register(&pool, new_user("alice"), WORK_FACTOR)
        .await
        .unwrap();

    let result = MessageRepository::create(&pool, "alice", "nobody", "hi").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn register_login_message_read_flow() {
    let (app, pool) = setup().await;

    let alice_token = register(&app, "alice").await;
    let bob_token = register(&app, "bob").await;
    let charlie_token = register(&app, "charlie").await;

    // Backdate alice's last login so the advance is observable even
    // within the same second.
    sqlx::query("UPDATE users SET last_login_at = last_login_at - 1000 WHERE username = 'alice'")
        .execute(&pool)
        .await
        .unwrap();
    let (backdated,): (i64,) =
        sqlx::query_as("SELECT last_login_at FROM users WHERE username = 'alice'")
            .fetch_one(&pool)
            .await
            .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (after_login,): (i64,) =
        sqlx::query_as("SELECT last_login_at FROM users WHERE username = 'alice'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(after_login > backdated);

    // alice sends bob a message; it starts unread.
    let (status, body) = send(
        &app,
        "POST",
        "/api/messages",
        Some(&alice_token),
        Some(json!({"to_username": "bob", "body": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"]["from_username"], "alice");
    assert_eq!(body["message"]["to_username"], "bob");
    assert!(body["message"]["read_at"].is_null());
    let id = body["message"]["id"].as_str().unwrap().to_string();

    // The sender may not mark it read.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/messages/{}/read", id),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The recipient may.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/messages/{}/read", id),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["id"], id.as_str());
    assert!(body["message"]["read_at"].is_i64());

    // A third party may not even look at it.
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/messages/{}", id),
        Some(&charlie_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Sender and recipient both can.
    for token in [&alice_token, &bob_token] {
        let (status, body) = send(&app, "GET", &format!("/api/messages/{}", id), Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"]["from_user"]["username"], "alice");
        assert_eq!(body["message"]["to_user"]["username"], "bob");
    }
}

#[tokio::test]
async fn missing_fields_rejected() {
    let (app, _pool) = setup().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let token = register(&app, "alice").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/messages",
        Some(&token),
        Some(json!({"to_username": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_username_over_http() {
    let (app, _pool) = setup().await;

    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "password": "other",
            "first_name": "B",
            "last_name": "M",
            "phone": "556",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username taken. Please pick another!");
}

#[tokio::test]
async fn bad_credentials_rejected() {
    let (app, _pool) = setup().await;

    register(&app, "alice").await;

    // Wrong password and unknown username get the same answer.
    for login in [
        json!({"username": "alice", "password": "wrong"}),
        json!({"username": "nobody", "password": "secret"}),
    ] {
        let (status, body) = send(&app, "POST", "/api/auth/login", None, Some(login)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid username/password");
    }
}

#[tokio::test]
async fn protected_routes_require_token() {
    let (app, _pool) = setup().await;

    let (status, _) = send(&app, "GET", "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/users", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/users/alice", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_users_shows_public_fields_only() {
    let (app, _pool) = setup().await;

    let token = register(&app, "alice").await;
    register(&app, "bob").await;

    let (status, body) = send(&app, "GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);

    let alice = users[0].as_object().unwrap();
    assert_eq!(alice["username"], "alice");
    assert!(alice.get("password").is_none());
    assert!(alice.get("join_at").is_none());
}

#[tokio::test]
async fn profile_routes_enforce_same_user() {
    let (app, _pool) = setup().await;

    let alice_token = register(&app, "alice").await;
    register(&app, "bob").await;

    // Own profile, password withheld.
    let (status, body) = send(&app, "GET", "/api/users/alice", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"]["join_at"].is_i64());
    assert!(body["user"].as_object().unwrap().get("password").is_none());

    // Someone else's profile and mailboxes are off limits.
    for uri in [
        "/api/users/bob",
        "/api/users/bob/to",
        "/api/users/bob/from",
    ] {
        let (status, _) = send(&app, "GET", uri, Some(&alice_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn mailboxes_join_counterpart_snapshots() {
    let (app, pool) = setup().await;

    let alice_token = register(&app, "alice").await;
    let bob_token = register(&app, "bob").await;

    MessageRepository::create(&pool, "alice", "bob", "hi")
        .await
        .unwrap();

    let (status, body) = send(&app, "GET", "/api/users/bob/to", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["body"], "hi");
    assert_eq!(messages[0]["from_user"]["username"], "alice");

    let (status, body) = send(&app, "GET", "/api/users/alice/from", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["to_user"]["username"], "bob");

    // Nothing received yet in the other direction.
    let (status, body) = send(&app, "GET", "/api/users/alice/to", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn mailbox_of_unknown_user_is_not_found() {
    let (app, _pool) = setup().await;

    // A token asserts a username without a storage lookup, so one can
    // exist for a user with no row; the mailbox query still 404s.
    let ghost_token = auth::issue_token("ghost", SECRET).unwrap();

    let (status, _) = send(&app, "GET", "/api/users/ghost/to", Some(&ghost_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_message_id_is_unauthorized_not_missing() {
    let (app, _pool) = setup().await;

    let token = register(&app, "alice").await;

    let (status, _) = send(&app, "GET", "/api/messages/no-such-id", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/messages/no-such-id/read",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_rejected() {
    let (app, _pool) = setup().await;

    register(&app, "alice").await;

    let forged = auth::issue_token("alice", "some-other-secret").unwrap();
    let (status, _) = send(&app, "GET", "/api/users", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
