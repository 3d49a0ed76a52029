use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use quill_db::entities::{author, category, comment, post, tag};

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Handler error type: status code plus JSON body
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Uniform 401 for every authentication failure. The reason (bad signature,
/// expired, wrong kind, unknown subject, wrong password) is never exposed.
pub fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Invalid or missing credentials".to_string(),
            code: Some("UNAUTHORIZED".to_string()),
        }),
    )
}

pub fn not_found(resource: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{} not found", resource),
            code: Some("NOT_FOUND".to_string()),
        }),
    )
}

pub fn conflict(message: impl Into<String>) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: message.into(),
            code: Some("CONFLICT".to_string()),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
            code: Some("BAD_REQUEST".to_string()),
        }),
    )
}

pub fn db_error(err: sea_orm::DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Database error: {}", err),
            code: None,
        }),
    )
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
            code: None,
        }),
    )
}

// ============================================================
// Auth
// ============================================================

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login: one access and one refresh token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful refresh: a new access token only
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Password change request body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Generic success message
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================
// Authors
// ============================================================

/// Author as exposed over the wire (never includes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<author::Model> for AuthorResponse {
    fn from(model: author::Model) -> Self {
        let full_name = model.full_name();
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            full_name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Signup request; the plaintext password is hashed before persistence
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAuthorRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Partial author update; the password cannot be set here, only through
/// the change-password endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateAuthorRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// List of authors with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorList {
    pub authors: Vec<AuthorResponse>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Query parameters for filtering authors
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorQuery {
    /// Filter by username (partial match)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Filter by email (partial match)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================================
// Posts
// ============================================================

/// Tag reference embedded in post responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
}

impl From<tag::Model> for TagRef {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Category reference embedded in post responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

impl From<category::Model> for CategoryRef {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Post with its tag and category links
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub tags: Vec<TagRef>,
    pub categories: Vec<CategoryRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn from_parts(
        model: post::Model,
        tags: Vec<tag::Model>,
        categories: Vec<category::Model>,
    ) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
            author_id: model.author_id,
            tags: tags.into_iter().map(TagRef::from).collect(),
            categories: categories.into_iter().map(CategoryRef::from).collect(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Create a post; the author is the authenticated principal
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    /// Tags to link (must already exist)
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    /// Categories to link (must already exist)
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

/// Partial post update; `tag_ids`/`category_ids` replace the full link set
/// when present
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<Uuid>>,
}

/// List of posts with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostList {
    pub posts: Vec<PostResponse>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Query parameters for filtering posts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostQuery {
    /// Filter by author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    /// Filter by linked tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<Uuid>,
    /// Filter by linked category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    /// Filter by title (partial match)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================================
// Comments
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub content: String,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<comment::Model> for CommentResponse {
    fn from(model: comment::Model) -> Self {
        Self {
            id: model.id,
            content: model.content,
            post_id: model.post_id,
            author_id: model.author_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Create a comment; the author is the authenticated principal
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub post_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCommentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// List of comments with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentList {
    pub comments: Vec<CommentResponse>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Query parameters for filtering comments
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentQuery {
    /// Filter by post
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Uuid>,
    /// Filter by author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================================
// Tags and categories
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<tag::Model> for TagResponse {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagList {
    pub tags: Vec<TagResponse>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryList {
    pub categories: Vec<CategoryResponse>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Query parameters for filtering tags or categories by name
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NameQuery {
    /// Filter by name (partial match)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// ============================================================
// System
// ============================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Clamp pagination query values: offset defaults to 0, limit to 100,
/// capped at 1000.
pub fn pagination(offset: Option<usize>, limit: Option<usize>) -> (usize, usize) {
    (offset.unwrap_or(0), limit.unwrap_or(100).clamp(1, 1000))
}
