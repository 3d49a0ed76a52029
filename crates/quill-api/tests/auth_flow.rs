//! End-to-end tests for the API over an in-memory database.
//!
//! Each test builds the full router (public, refresh and protected route
//! groups with their middleware) and drives it with `tower::ServiceExt`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use quill_api::{build_router, AppState};
use quill_auth::TokenCodec;

const PRIVATE_PEM: &[u8] = include_bytes!("../testdata/rsa_private.pem");
const PUBLIC_PEM: &[u8] = include_bytes!("../testdata/rsa_public.pem");

const ISSUER: &str = "quill-api";
const AUDIENCE: &str = "https://blog.example.com";

async fn test_app() -> Router {
    let db = quill_db::connect("sqlite::memory:").await.unwrap();
    quill_db::migrate(&db).await.unwrap();

    let codec = TokenCodec::from_rsa_pem(
        PRIVATE_PEM,
        PUBLIC_PEM,
        None,
        ISSUER.to_string(),
        AUDIENCE.to_string(),
    )
    .unwrap();

    build_router(Arc::new(AppState {
        db,
        codec: Arc::new(codec),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 86400,
    }))
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup(app: &Router, username: &str, password: &str) -> Value {
    let (status, body) = request(
        app,
        "POST",
        "/api/authors",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "first_name": "Test",
            "last_name": "Author",
            "password": password,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    body
}

async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let (status, body) = request(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app().await;

    let (status, body) = request(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_signup_then_login() {
    let app = test_app().await;
    let created = signup(&app, "alice", "s3cret-pass").await;

    assert_eq!(created["username"], "alice");
    assert_eq!(created["full_name"], "Test Author");
    assert!(created.get("password_hash").is_none());

    let (access, refresh) = login(&app, "alice", "s3cret-pass").await;

    assert!(!access.is_empty());
    assert!(!refresh.is_empty());
    assert_ne!(access, refresh);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "not-it" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or missing credentials");
}

#[tokio::test]
async fn test_login_unknown_username() {
    let app = test_app().await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "whatever" })),
    )
    .await;

    // Same body as a wrong password; existence of accounts is not revealed
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or missing credentials");
}

#[tokio::test]
async fn test_signup_duplicate_username() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/authors",
        None,
        Some(json!({
            "username": "alice",
            "email": "other@example.com",
            "first_name": "Other",
            "last_name": "Person",
            "password": "another-pass",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_refresh_issues_new_access_token() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;
    let (_, refresh) = login(&app, "alice", "s3cret-pass").await;

    let (status, body) = request(&app, "POST", "/api/auth/refresh", Some(&refresh), None).await;

    assert_eq!(status, StatusCode::OK);
    let new_access = body["access_token"].as_str().unwrap();
    assert!(!new_access.is_empty());

    // The freshly minted access token works on a protected endpoint
    let (status, _) = request(&app, "GET", "/api/posts", Some(new_access), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_access_token_rejected_on_refresh() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;
    let (access, _) = login(&app, "alice", "s3cret-pass").await;

    let (status, _) = request(&app, "POST", "/api/auth/refresh", Some(&access), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_rejected_on_protected_endpoint() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;
    let (_, refresh) = login(&app, "alice", "s3cret-pass").await;

    let (status, _) = request(&app, "GET", "/api/posts", Some(&refresh), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_endpoint_requires_token() {
    let app = test_app().await;

    let (status, _) = request(&app, "GET", "/api/posts", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = test_app().await;
    signup(&app, "alice", "old-password").await;
    let (access, _) = login(&app, "alice", "old-password").await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&access),
        Some(json!({ "old_password": "old-password", "new_password": "new-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Old password no longer logs in, new one does
    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "old-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    login(&app, "alice", "new-password").await;
}

#[tokio::test]
async fn test_change_password_wrong_old_password() {
    let app = test_app().await;
    signup(&app, "alice", "old-password").await;
    let (access, _) = login(&app, "alice", "old-password").await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&access),
        Some(json!({ "old_password": "not-it", "new_password": "new-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The password is unchanged
    login(&app, "alice", "old-password").await;
}

#[tokio::test]
async fn test_post_crud_with_tags_and_categories() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;
    let (access, _) = login(&app, "alice", "s3cret-pass").await;

    let (status, tag) = request(
        &app,
        "POST",
        "/api/tags",
        Some(&access),
        Some(json!({ "name": "rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tag_id = tag["id"].as_str().unwrap().to_string();

    let (status, category) = request(
        &app,
        "POST",
        "/api/categories",
        Some(&access),
        Some(json!({ "name": "tutorials" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_str().unwrap().to_string();

    let (status, post) = request(
        &app,
        "POST",
        "/api/posts",
        Some(&access),
        Some(json!({
            "title": "Hello",
            "content": "First post",
            "tag_ids": [tag_id],
            "category_ids": [category_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create post failed: {post}");
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["tags"][0]["name"], "rust");
    assert_eq!(post["categories"][0]["name"], "tutorials");

    // Update replaces the title and clears the tag links
    let (status, updated) = request(
        &app,
        "PATCH",
        &format!("/api/posts/{post_id}"),
        Some(&access),
        Some(json!({ "title": "Hello again", "tag_ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Hello again");
    assert_eq!(updated["tags"].as_array().unwrap().len(), 0);
    assert_eq!(updated["categories"].as_array().unwrap().len(), 1);

    // Filter by category finds it, filter by the removed tag does not
    let (status, listed) = request(
        &app,
        "GET",
        &format!("/api/posts?category_id={category_id}"),
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);

    let (status, listed) = request(
        &app,
        "GET",
        &format!("/api/posts?tag_id={tag_id}"),
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 0);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/posts/{post_id}"),
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(
        &app,
        "GET",
        &format!("/api/posts/{post_id}"),
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_rejects_unknown_tag_id() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;
    let (access, _) = login(&app, "alice", "s3cret-pass").await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/posts",
        Some(&access),
        Some(json!({
            "title": "Hello",
            "content": "First post",
            "tag_ids": [uuid::Uuid::new_v4()],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The rejected create must not leave an orphan post behind
    let (status, listed) = request(&app, "GET", "/api/posts", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 0);
}

#[tokio::test]
async fn test_rejected_update_leaves_post_untouched() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;
    let (access, _) = login(&app, "alice", "s3cret-pass").await;

    let (_, tag) = request(
        &app,
        "POST",
        "/api/tags",
        Some(&access),
        Some(json!({ "name": "rust" })),
    )
    .await;
    let tag_id = tag["id"].as_str().unwrap().to_string();

    let (_, post) = request(
        &app,
        "POST",
        "/api/posts",
        Some(&access),
        Some(json!({ "title": "Hello", "content": "Body", "tag_ids": [tag_id] })),
    )
    .await;
    let post_id = post["id"].as_str().unwrap().to_string();

    // New title alongside an unknown category id: nothing may be applied
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("/api/posts/{post_id}"),
        Some(&access),
        Some(json!({
            "title": "Changed",
            "category_ids": [uuid::Uuid::new_v4()],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, fetched) = request(
        &app,
        "GET",
        &format!("/api/posts/{post_id}"),
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Hello");
    assert_eq!(fetched["tags"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_comment_flow() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;
    let (access, _) = login(&app, "alice", "s3cret-pass").await;

    let (_, post) = request(
        &app,
        "POST",
        "/api/posts",
        Some(&access),
        Some(json!({ "title": "Hello", "content": "First post" })),
    )
    .await;
    let post_id = post["id"].as_str().unwrap().to_string();

    let (status, comment) = request(
        &app,
        "POST",
        "/api/comments",
        Some(&access),
        Some(json!({ "post_id": post_id, "content": "Nice one" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["content"], "Nice one");

    let (status, listed) = request(
        &app,
        "GET",
        &format!("/api/comments?post_id={post_id}"),
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);

    // Comments on a missing post are rejected
    let (status, _) = request(
        &app,
        "POST",
        "/api/comments",
        Some(&access),
        Some(json!({ "post_id": uuid::Uuid::new_v4(), "content": "orphan" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tag_name_conflict() {
    let app = test_app().await;
    signup(&app, "alice", "s3cret-pass").await;
    let (access, _) = login(&app, "alice", "s3cret-pass").await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/tags",
        Some(&access),
        Some(json!({ "name": "rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(
        &app,
        "POST",
        "/api/tags",
        Some(&access),
        Some(json!({ "name": "rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_author_list_pagination() {
    let app = test_app().await;
    for i in 0..5 {
        signup(&app, &format!("author{i}"), "s3cret-pass").await;
    }
    let (access, _) = login(&app, "author0", "s3cret-pass").await;

    let (status, listed) = request(
        &app,
        "GET",
        "/api/authors?offset=2&limit=2",
        Some(&access),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 5);
    assert_eq!(listed["authors"].as_array().unwrap().len(), 2);
    assert_eq!(listed["offset"], 2);
    assert_eq!(listed["limit"], 2);
}

#[tokio::test]
async fn test_pagination_offset_is_row_offset() {
    let app = test_app().await;
    for i in 0..5 {
        signup(&app, &format!("author{i}"), "s3cret-pass").await;
    }
    let (access, _) = login(&app, "author0", "s3cret-pass").await;

    // Offset not aligned to the limit: skip exactly three rows, not a page
    let (status, listed) = request(
        &app,
        "GET",
        "/api/authors?offset=3&limit=2",
        Some(&access),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 5);
    let usernames: Vec<&str> = listed["authors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["username"].as_str().unwrap())
        .collect();
    assert_eq!(usernames, vec!["author3", "author4"]);
    assert_eq!(listed["offset"], 3);
}
