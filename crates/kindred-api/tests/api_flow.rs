use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use kindred_api::auth::AppStateInner;
use kindred_api::notify::BrokerPublisher;
use kindred_api::service::{AccountService, MessagingService, ProfileService};
use kindred_api::tokens::{TokenIssuer, default_lifetime};
use kindred_db::Database;

fn app() -> Router {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let tokens = Arc::new(TokenIssuer::new("flow-test-secret", default_lifetime()).unwrap());
    let state = Arc::new(AppStateInner {
        accounts: AccountService::new(db.clone(), tokens),
        profiles: ProfileService::new(db.clone()),
        messaging: MessagingService::new(db, Arc::new(BrokerPublisher::disabled())),
    });
    kindred_api::router(state)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, email: &str, username: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({ "email": email, "username": username, "password": "Secret123!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn register_login_and_duplicate_email() {
    let app = app();
    register(&app, "alice@example.com", "alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({ "email": "ALICE@example.com", "username": "other", "password": "Secret123!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["message"], "Email already registered");
    assert_eq!(body["error"], "Conflict");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "Secret123!" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("password").is_none());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "Wrong123!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn invalid_registration_lists_field_errors() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({ "email": "nope", "username": "ab", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let messages = body["message"].as_array().unwrap();
    assert!(messages.iter().any(|m| m.as_str().unwrap().starts_with("email:")));
    assert!(messages.iter().any(|m| m.as_str().unwrap().starts_with("username:")));
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/getProfile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);

    let (status, _) = call(&app, Method::GET, "/api/conversations", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_lifecycle() {
    let app = app();
    let (token, user_id) = register(&app, "alice@example.com", "alice").await;

    let (status, _) = call(&app, Method::GET, "/api/getProfile", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/createProfile",
        Some(&token),
        Some(json!({ "displayName": "Alice", "dateOfBirth": "1995-05-15", "interests": ["chess"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["userId"], user_id.as_str());
    assert_eq!(body["data"]["zodiacSign"], "TAURUS");
    let profile_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/updateProfile",
        Some(&token),
        Some(json!({ "dateOfBirth": "1990-07-30" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["zodiacSign"], "LEO");
    assert_eq!(body["data"]["displayName"], "Alice");
    assert!(body["data"]["horoscope"].as_str().unwrap().starts_with("As a Leo"));

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/profiles/{}", profile_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["interests"], json!(["chess"]));

    let (status, body) = call(&app, Method::POST, "/api/createProfile", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Profile already exists for this user");
}

#[tokio::test]
async fn message_round_trip_between_two_accounts() {
    let app = app();
    let (alice, alice_id) = register(&app, "alice@example.com", "alice").await;
    let (bob, bob_id) = register(&app, "bob@example.com", "bob").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/sendMessage",
        Some(&alice),
        Some(json!({ "receiverId": bob_id, "content": "hello bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["status"], "SENT");
    assert_eq!(body["data"]["messageType"], "TEXT");
    let conversation_id = body["data"]["conversationId"].as_str().unwrap().to_string();
    let message_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/viewMessages/{}", conversation_id),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalMessages"], 1);
    assert_eq!(body["data"]["messages"][0]["status"], "READ");

    let (_, body) = call(&app, Method::GET, "/api/conversations?limit=10", Some(&bob), None).await;
    assert_eq!(body["data"]["total"], 1);
    let conversation = &body["data"]["conversations"][0];
    assert_eq!(conversation["messageCount"], 1);
    assert_eq!(conversation["lastMessage"], "hello bob");
    assert_eq!(conversation["participants"].as_array().unwrap().len(), 2);

    // reactions
    let reaction_uri = format!("/api/messages/{}/reaction", message_id);
    let (status, body) = call(&app, Method::POST, &reaction_uri, Some(&bob), Some(json!({ "emoji": "🔥" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["userId"], bob_id.as_str());
    let (status, _) = call(&app, Method::POST, &reaction_uri, Some(&bob), Some(json!({ "emoji": "🔥" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (carol, _) = register(&app, "carol@example.com", "carol").await;
    let (status, _) = call(&app, Method::POST, &reaction_uri, Some(&carol), Some(json!({ "emoji": "👀" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("{}?emoji=%F0%9F%94%A5", reaction_uri),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    // only the sender may edit
    let message_uri = format!("/api/messages/{}", message_id);
    let (status, _) = call(&app, Method::PUT, &message_uri, Some(&bob), Some(json!({ "content": "x" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = call(&app, Method::PUT, &message_uri, Some(&alice), Some(json!({ "content": "hello again" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isEdited"], true);

    // blocking stops further messages until unblocked
    let (status, body) = call(&app, Method::POST, &format!("/api/block-user/{}", alice_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User blocked successfully");
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/sendMessage",
        Some(&alice),
        Some(json!({ "receiverId": bob_id, "content": "are you there?" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::POST, &format!("/api/unblock-user/{}", alice_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::DELETE, &message_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message deleted successfully");
    let (_, body) = call(&app, Method::GET, "/api/conversations", Some(&alice), None).await;
    assert_eq!(body["data"]["conversations"][0]["messageCount"], 0);
}

#[tokio::test]
async fn me_returns_the_account_projection() {
    let app = app();
    let (token, user_id) = register(&app, "alice@example.com", "alice").await;

    let (status, body) = call(&app, Method::GET, "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["status"], "ACTIVE");
    assert!(body["data"].get("password").is_none());
}
