//! End-to-end tests driving the router over an in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use notecode_api::{
    adapters::MemoryStore,
    config::Config,
    web::{auth::UserResponse, rest::NoteResponse, router, AppState},
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

fn test_app() -> Router {
    let config = Config::from_lookup(|key| match key {
        "STORE_BACKEND" => Some("memory".to_string()),
        "COOKIE_SECURE" => Some("false".to_string()),
        _ => None,
    })
    .expect("memory config should load");
    let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(config));
    router(Arc::new(state))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("valid request")
}

async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

/// Returns the `session=...` pair from a `Set-Cookie` header.
fn session_from(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("response should set a cookie");
    set_cookie
        .split(';')
        .next()
        .expect("cookie has a name=value pair")
        .to_string()
}

async fn signup(app: &Router, email: &str) -> (UserResponse, String) {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/signup",
            None,
            json!({ "email": email, "password": "hunter22", "firstName": "Ada" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = session_from(&response);
    (read_json(response).await, cookie)
}

async fn create_note(app: &Router, cookie: &str, body: Value) -> NoteResponse {
    let response = send(app, json_request("POST", "/api/notes", Some(cookie), body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let response = send(&app, empty_request("GET", "/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_note_routes_require_a_session() {
    let app = test_app();

    let response = send(&app, empty_request("GET", "/api/notes", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        empty_request("GET", "/api/notes", Some("session=forged")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_login_and_current_user() {
    let app = test_app();
    let (user, cookie) = signup(&app, "Ada@Example.com").await;
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    assert_eq!(user.first_name.as_deref(), Some("Ada"));

    let response = send(&app, empty_request("GET", "/api/auth/user", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me: UserResponse = read_json(response).await;
    assert_eq!(me.id, user.id);

    // Duplicate email is rejected.
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/signup",
            None,
            json!({ "email": "ada@example.com", "password": "other" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    tick().await;
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/login",
            None,
            json!({ "email": "ada@example.com", "password": "hunter22" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second_cookie = session_from(&response);
    let logged_in: UserResponse = read_json(response).await;
    assert_eq!(logged_in.id, user.id);
    assert_eq!(logged_in.created_at, user.created_at);
    assert_eq!(logged_in.first_name.as_deref(), Some("Ada"));
    assert!(logged_in.updated_at > user.updated_at);

    let response = send(
        &app,
        empty_request("GET", "/api/notes", Some(&second_cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_requires_credentials() {
    let app = test_app();
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/signup",
            None,
            json!({ "email": "  ", "password": "x" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let app = test_app();
    let (_, cookie) = signup(&app, "grace@example.com").await;

    let response = send(&app, empty_request("POST", "/api/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, empty_request("GET", "/api/notes", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, empty_request("POST", "/api/logout", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_note_crud_round() {
    let app = test_app();
    let (user, cookie) = signup(&app, "ada@example.com").await;

    let response = send(
        &app,
        json_request("POST", "/api/notes", Some(&cookie), json!({ "title": "   " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let note = create_note(&app, &cookie, json!({ "title": "Todo", "content": "- eggs" })).await;
    assert_eq!(note.user_id, user.id);
    assert_eq!(note.language, "text");
    assert_eq!(note.content, "- eggs");

    let uri = format!("/api/notes/{}", note.id);
    let response = send(&app, empty_request("GET", &uri, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: NoteResponse = read_json(response).await;
    assert_eq!(fetched.title, "Todo");

    tick().await;
    let response = send(
        &app,
        json_request("PATCH", &uri, Some(&cookie), json!({ "content": "- milk" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: NoteResponse = read_json(response).await;
    assert_eq!(updated.title, "Todo");
    assert_eq!(updated.language, "text");
    assert_eq!(updated.content, "- milk");
    assert!(updated.updated_at > note.updated_at);

    let response = send(
        &app,
        json_request("PATCH", &uri, Some(&cookie), json!({ "title": "" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, empty_request("DELETE", &uri, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, empty_request("GET", &uri, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deleting again is still a success.
    let response = send(&app, empty_request("DELETE", &uri, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        json_request("PATCH", &uri, Some(&cookie), json!({ "content": "x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_note_id_is_rejected() {
    let app = test_app();
    let (_, cookie) = signup(&app, "ada@example.com").await;
    let response = send(&app, empty_request("GET", "/api/notes/not-a-uuid", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_notes_are_isolated_between_users() {
    let app = test_app();
    let (_, alice) = signup(&app, "alice@example.com").await;
    let (_, bob) = signup(&app, "bob@example.com").await;

    let note = create_note(&app, &alice, json!({ "title": "Diary", "language": "markdown" })).await;
    let uri = format!("/api/notes/{}", note.id);

    let response = send(&app, empty_request("GET", &uri, Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        json_request("PATCH", &uri, Some(&bob), json!({ "title": "Mine now" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, empty_request("DELETE", &uri, Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, empty_request("GET", "/api/notes", Some(&bob))).await;
    let bobs: Vec<NoteResponse> = read_json(response).await;
    assert!(bobs.is_empty());

    let response = send(&app, empty_request("GET", &uri, Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let kept: NoteResponse = read_json(response).await;
    assert_eq!(kept.title, "Diary");
    assert_eq!(kept.language, "markdown");
}

#[tokio::test]
async fn test_search_is_owner_scoped_and_case_insensitive() {
    let app = test_app();
    let (_, u1) = signup(&app, "u1@example.com").await;
    let (_, u2) = signup(&app, "u2@example.com").await;

    let a = create_note(&app, &u1, json!({ "title": "Shopping List" })).await;
    tick().await;
    let b = create_note(&app, &u1, json!({ "title": "shopping ideas" })).await;
    tick().await;
    create_note(&app, &u2, json!({ "title": "Shopping List" })).await;
    create_note(&app, &u1, json!({ "title": "Recipes", "content": "shop" })).await;

    let response = send(&app, empty_request("GET", "/api/notes/search?q=shop", Some(&u1))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let found: Vec<NoteResponse> = read_json(response).await;
    let ids: Vec<Uuid> = found.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);

    let response = send(&app, empty_request("GET", "/api/notes/search", Some(&u1))).await;
    let everything: Vec<NoteResponse> = read_json(response).await;
    assert_eq!(everything.len(), 3);

    let response = send(&app, empty_request("GET", "/api/notes", Some(&u1))).await;
    let listing: Vec<NoteResponse> = read_json(response).await;
    let listed: Vec<Uuid> = listing.iter().map(|n| n.id).collect();
    let searched: Vec<Uuid> = everything.iter().map(|n| n.id).collect();
    assert_eq!(listed, searched);
}
