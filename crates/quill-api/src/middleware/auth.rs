//! Bearer Authentication Middleware
//!
//! Extracts the bearer token from the Authorization header, decodes and
//! validates it, resolves the subject claim to an Author row, and makes the
//! authenticated principal available to handlers via Axum's Extension.
//!
//! Two middleware share one validation path, differing only in the token
//! kind they accept: [`require_access`] guards normal endpoints and
//! [`require_refresh`] guards only the token-refresh endpoint. This is what
//! scopes a refresh token to the refresh operation.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::debug;

use quill_auth::TokenKind;
use quill_db::entities::{author, prelude::Author};

use crate::models::{db_error, unauthorized, ApiError};
use crate::AppState;

/// The authenticated principal attached to the request
#[derive(Debug, Clone)]
pub struct CurrentAuthor(pub author::Model);

/// Guard for normal endpoints: accepts only access-kind tokens.
pub async fn require_access(
    state: State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(state, request, next, TokenKind::Access).await
}

/// Guard for the token-refresh endpoint: accepts only refresh-kind tokens.
pub async fn require_refresh(
    state: State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(state, request, next, TokenKind::Refresh).await
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Per-request authentication state machine.
///
/// Every rejection is the same 401; the actual reason is only logged at
/// debug level so nothing leaks to the client.
async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
    expected_kind: TokenKind,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        debug!("Bearer auth: no credentials presented");
        unauthorized()
    })?;

    let claims = state.codec.decode(token, expected_kind).map_err(|e| {
        debug!("Bearer auth: token rejected: {}", e);
        unauthorized()
    })?;

    let author = Author::find()
        .filter(author::Column::Username.eq(&claims.sub))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            debug!("Bearer auth: subject resolves to no author");
            unauthorized()
        })?;

    request.extensions_mut().insert(CurrentAuthor(author));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorResponse;
    use axum::{
        body::Body, http::Request, http::StatusCode, middleware, routing::get, Json, Router,
    };
    use chrono::{Duration, Utc};
    use quill_auth::{SubjectClaims, TokenCodec};
    use sea_orm::{ActiveModelTrait, Set};
    use tower::ServiceExt; // For oneshot()
    use uuid::Uuid;

    const PRIVATE_PEM: &[u8] = include_bytes!("../../testdata/rsa_private.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("../../testdata/rsa_public.pem");

    const ISSUER: &str = "quill-api";
    const AUDIENCE: &str = "https://blog.example.com";

    async fn test_state() -> Arc<AppState> {
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

        Arc::new(AppState {
            db,
            codec: Arc::new(codec),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 86400,
        })
    }

    async fn insert_author(state: &AppState, username: &str) -> author::Model {
        author::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.com")),
            first_name: Set("Test".to_string()),
            last_name: Set("Author".to_string()),
            password_hash: Set("$argon2id$fake".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&state.db)
        .await
        .unwrap()
    }

    fn subject(username: &str) -> SubjectClaims {
        SubjectClaims {
            sub: username.to_string(),
            email: format!("{username}@example.com"),
            name: "Test Author".to_string(),
        }
    }

    // Test handler that echoes the authenticated principal's username
    async fn protected_handler(
        axum::Extension(CurrentAuthor(author)): axum::Extension<CurrentAuthor>,
    ) -> Json<String> {
        Json(author.username)
    }

    fn access_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/protected", get(protected_handler))
            .layer(middleware::from_fn_with_state(state.clone(), require_access))
            .with_state(state)
    }

    async fn get_protected(app: Router, auth_header: Option<String>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = auth_header {
            builder = builder.header("Authorization", value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_valid_access_token() {
        let state = test_state().await;
        insert_author(&state, "alice").await;

        let token = state
            .codec
            .encode(
                Duration::hours(1),
                Some(TokenKind::Access),
                subject("alice"),
            )
            .unwrap();

        let (status, body) =
            get_protected(access_app(state), Some(format!("Bearer {token}"))).await;

        assert_eq!(status, StatusCode::OK);
        let username: String = serde_json::from_slice(&body).unwrap();
        assert_eq!(username, "alice");
    }

    #[tokio::test]
    async fn test_missing_authorization_header() {
        let state = test_state().await;

        let (status, body) = get_protected(access_app(state), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code.as_deref(), Some("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn test_non_bearer_authorization_header() {
        let state = test_state().await;

        let (status, _) =
            get_protected(access_app(state), Some("Basic dXNlcjpwYXNz".to_string())).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_on_access_endpoint() {
        let state = test_state().await;
        insert_author(&state, "alice").await;

        let token = state
            .codec
            .encode(
                Duration::hours(1),
                Some(TokenKind::Refresh),
                subject("alice"),
            )
            .unwrap();

        let (status, _) = get_protected(access_app(state), Some(format!("Bearer {token}"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_access_token_rejected_on_refresh_endpoint() {
        let state = test_state().await;
        insert_author(&state, "alice").await;

        let app = Router::new()
            .route("/refresh-only", get(protected_handler))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                require_refresh,
            ))
            .with_state(state.clone());

        let token = state
            .codec
            .encode(
                Duration::hours(1),
                Some(TokenKind::Access),
                subject("alice"),
            )
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/refresh-only")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token() {
        let state = test_state().await;
        insert_author(&state, "alice").await;

        let token = state
            .codec
            .encode(
                Duration::seconds(-10),
                Some(TokenKind::Access),
                subject("alice"),
            )
            .unwrap();

        let (status, _) = get_protected(access_app(state), Some(format!("Bearer {token}"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let state = test_state().await;
        // No author row for "ghost"

        let token = state
            .codec
            .encode(
                Duration::hours(1),
                Some(TokenKind::Access),
                subject("ghost"),
            )
            .unwrap();

        let (status, body) =
            get_protected(access_app(state), Some(format!("Bearer {token}"))).await;

        // Indistinguishable from any other auth failure
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "Invalid or missing credentials");
    }
}
