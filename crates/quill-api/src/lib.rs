pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use quill_auth::TokenCodec;
use sea_orm::DatabaseConnection;

/// Application state shared across handlers
///
/// Built once at startup and read concurrently without locking: the codec
/// and token durations are immutable, the connection pool is internally
/// synchronized.
pub struct AppState {
    pub db: DatabaseConnection,
    pub codec: Arc<TokenCodec>,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quill Blog API",
        version = "0.1.0",
        description = "CRUD blog API with JWT authentication",
        contact(
            name = "Quill Team",
            email = "team@quill.dev"
        )
    ),
    paths(
        handlers::health_check,
        handlers::login,
        handlers::refresh,
        handlers::change_password,
        handlers::create_author,
        handlers::list_authors,
        handlers::get_author,
        handlers::update_author,
        handlers::delete_author,
        handlers::create_post,
        handlers::list_posts,
        handlers::get_post,
        handlers::update_post,
        handlers::delete_post,
        handlers::create_comment,
        handlers::list_comments,
        handlers::get_comment,
        handlers::update_comment,
        handlers::delete_comment,
        handlers::create_tag,
        handlers::list_tags,
        handlers::get_tag,
        handlers::update_tag,
        handlers::delete_tag,
        handlers::create_category,
        handlers::list_categories,
        handlers::get_category,
        handlers::update_category,
        handlers::delete_category,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::RefreshResponse,
            models::ChangePasswordRequest,
            models::MessageResponse,
            models::AuthorResponse,
            models::CreateAuthorRequest,
            models::UpdateAuthorRequest,
            models::AuthorList,
            models::TagRef,
            models::CategoryRef,
            models::PostResponse,
            models::CreatePostRequest,
            models::UpdatePostRequest,
            models::PostList,
            models::CommentResponse,
            models::CreateCommentRequest,
            models::UpdateCommentRequest,
            models::CommentList,
            models::TagResponse,
            models::CategoryResponse,
            models::NameRequest,
            models::TagList,
            models::CategoryList,
            models::HealthResponse,
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "authors", description = "Author management endpoints"),
        (name = "posts", description = "Post management endpoints"),
        (name = "comments", description = "Comment management endpoints"),
        (name = "taxonomy", description = "Tag and category endpoints"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS (for development)
    pub enable_cors: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            enable_cors: true,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();
        let router = build_router(self.state.clone()).merge(
            SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc),
        );

        // Build middleware stack
        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_origin(Any);
            router = router.layer(cors);
        }

        router
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

/// Assemble the API routes around the shared state.
///
/// Three groups: public (health, login, signup), refresh (the token-refresh
/// endpoint behind the refresh-kind authenticator) and protected (everything
/// else behind the access-kind authenticator).
pub fn build_router(state: Arc<AppState>) -> Router {
    let public_router = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/authors", post(handlers::create_author))
        .with_state(state.clone());

    let refresh_router = Router::new()
        .route("/api/auth/refresh", post(handlers::refresh))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_refresh,
        ))
        .with_state(state.clone());

    let protected_router = Router::new()
        .route(
            "/api/auth/change-password",
            post(handlers::change_password),
        )
        .route("/api/authors", get(handlers::list_authors))
        .route(
            "/api/authors/{id}",
            get(handlers::get_author)
                .patch(handlers::update_author)
                .delete(handlers::delete_author),
        )
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/api/posts/{id}",
            get(handlers::get_post)
                .patch(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route(
            "/api/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/api/comments/{id}",
            get(handlers::get_comment)
                .patch(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
        .route(
            "/api/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route(
            "/api/tags/{id}",
            get(handlers::get_tag)
                .patch(handlers::update_tag)
                .delete(handlers::delete_tag),
        )
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/categories/{id}",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_access,
        ))
        .with_state(state);

    public_router.merge(refresh_router).merge(protected_router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        // Ensure OpenAPI spec can be generated without panics
        let _api_doc = ApiDoc::openapi();
    }
}
