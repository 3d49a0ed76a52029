//! Comment CRUD endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use quill_db::entities::{
    comment,
    prelude::{Comment, Post},
};

use crate::middleware::CurrentAuthor;
use crate::models::*;
use crate::AppState;

/// Comment on a post as the authenticated principal
#[utoipa::path(
    post,
    path = "/api/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Unknown post id", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAuthor(author)): Extension<CurrentAuthor>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    // The commented post must exist
    Post::find_by_id(body.post_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| bad_request("Unknown post id"))?;

    let now = Utc::now();
    let created = comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        content: Set(body.content),
        post_id: Set(body.post_id),
        author_id: Set(author.id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    info!(
        "Author '{}' commented on post {}",
        author.username, created.post_id
    );

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// List comments
#[utoipa::path(
    get,
    path = "/api/comments",
    params(
        ("post_id" = Option<Uuid>, Query, description = "Filter by post"),
        ("author_id" = Option<Uuid>, Query, description = "Filter by author"),
        ("offset" = Option<usize>, Query, description = "Pagination offset (default: 0)"),
        ("limit" = Option<usize>, Query, description = "Pagination limit (default: 100, max: 1000)")
    ),
    responses(
        (status = 200, description = "List of comments", body = CommentList),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CommentQuery>,
) -> Result<Json<CommentList>, ApiError> {
    debug!("Listing comments with filters: {:?}", query);

    let mut condition = Condition::all();

    if let Some(post_id) = query.post_id {
        condition = condition.add(comment::Column::PostId.eq(post_id));
    }

    if let Some(author_id) = query.author_id {
        condition = condition.add(comment::Column::AuthorId.eq(author_id));
    }

    let (offset, limit) = pagination(query.offset, query.limit);

    let select = Comment::find()
        .filter(condition)
        .order_by_desc(comment::Column::CreatedAt);

    let total = select.clone().count(&state.db).await.map_err(db_error)? as usize;
    let page = select
        .offset(offset as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(CommentList {
        comments: page.into_iter().map(CommentResponse::from).collect(),
        total,
        offset,
        limit,
    }))
}

/// Get a comment by id
#[utoipa::path(
    get,
    path = "/api/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = Comment::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Comment"))?;

    Ok(Json(comment.into()))
}

/// Update a comment
#[utoipa::path(
    patch,
    path = "/api/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated comment", body = CommentResponse),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = Comment::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Comment"))?;

    let mut active = comment.into_active_model();
    if let Some(content) = body.content {
        active.content = Set(content);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(db_error)?;

    Ok(Json(updated.into()))
}

/// Delete a comment
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let comment = Comment::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Comment"))?;

    comment.delete(&state.db).await.map_err(db_error)?;

    Ok(StatusCode::NO_CONTENT)
}
