//! Post CRUD endpoints, including tag and category links

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Query as SeaQuery, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, IntoActiveModel, LoaderTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use quill_db::entities::{
    post, post_category, post_tag,
    prelude::{Category, Post, PostCategory, PostTag, Tag},
};

use crate::middleware::CurrentAuthor;
use crate::models::*;
use crate::AppState;

/// Reject unknown tag ids. Runs before any row is written so a bad id
/// cannot leave a post behind.
async fn ensure_tags_exist(db: &DatabaseConnection, tag_ids: &[Uuid]) -> Result<(), ApiError> {
    let known = Tag::find()
        .filter(quill_db::entities::tag::Column::Id.is_in(tag_ids.to_vec()))
        .count(db)
        .await
        .map_err(db_error)?;
    if known as usize != tag_ids.len() {
        return Err(bad_request("Unknown tag id"));
    }
    Ok(())
}

/// Reject unknown category ids.
async fn ensure_categories_exist(
    db: &DatabaseConnection,
    category_ids: &[Uuid],
) -> Result<(), ApiError> {
    let known = Category::find()
        .filter(quill_db::entities::category::Column::Id.is_in(category_ids.to_vec()))
        .count(db)
        .await
        .map_err(db_error)?;
    if known as usize != category_ids.len() {
        return Err(bad_request("Unknown category id"));
    }
    Ok(())
}

/// Replace the tag links of a post. Ids must already be validated.
async fn set_post_tags(
    db: &DatabaseConnection,
    post_id: Uuid,
    tag_ids: &[Uuid],
) -> Result<(), ApiError> {
    PostTag::delete_many()
        .filter(post_tag::Column::PostId.eq(post_id))
        .exec(db)
        .await
        .map_err(db_error)?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    PostTag::insert_many(tag_ids.iter().map(|tag_id| post_tag::ActiveModel {
        post_id: Set(post_id),
        tag_id: Set(*tag_id),
    }))
    .exec(db)
    .await
    .map_err(db_error)?;

    Ok(())
}

/// Replace the category links of a post. Ids must already be validated.
async fn set_post_categories(
    db: &DatabaseConnection,
    post_id: Uuid,
    category_ids: &[Uuid],
) -> Result<(), ApiError> {
    PostCategory::delete_many()
        .filter(post_category::Column::PostId.eq(post_id))
        .exec(db)
        .await
        .map_err(db_error)?;

    if category_ids.is_empty() {
        return Ok(());
    }

    PostCategory::insert_many(category_ids.iter().map(|category_id| {
        post_category::ActiveModel {
            post_id: Set(post_id),
            category_id: Set(*category_id),
        }
    }))
    .exec(db)
    .await
    .map_err(db_error)?;

    Ok(())
}

/// Load a post's links and assemble the wire representation.
async fn post_response(
    db: &DatabaseConnection,
    model: post::Model,
) -> Result<PostResponse, ApiError> {
    let tags = model.find_related(Tag).all(db).await.map_err(db_error)?;
    let categories = model
        .find_related(Category)
        .all(db)
        .await
        .map_err(db_error)?;

    Ok(PostResponse::from_parts(model, tags, categories))
}

/// Create a post authored by the authenticated principal
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Unknown tag or category id", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAuthor(author)): Extension<CurrentAuthor>,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    ensure_tags_exist(&state.db, &body.tag_ids).await?;
    ensure_categories_exist(&state.db, &body.category_ids).await?;

    let now = Utc::now();
    let created = post::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(body.title),
        content: Set(body.content),
        author_id: Set(author.id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    set_post_tags(&state.db, created.id, &body.tag_ids).await?;
    set_post_categories(&state.db, created.id, &body.category_ids).await?;

    info!("Author '{}' created post {}", author.username, created.id);

    let response = post_response(&state.db, created).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List posts
#[utoipa::path(
    get,
    path = "/api/posts",
    params(
        ("author_id" = Option<Uuid>, Query, description = "Filter by author"),
        ("tag_id" = Option<Uuid>, Query, description = "Filter by linked tag"),
        ("category_id" = Option<Uuid>, Query, description = "Filter by linked category"),
        ("title" = Option<String>, Query, description = "Filter by title (partial match)"),
        ("offset" = Option<usize>, Query, description = "Pagination offset (default: 0)"),
        ("limit" = Option<usize>, Query, description = "Pagination limit (default: 100, max: 1000)")
    ),
    responses(
        (status = 200, description = "List of posts", body = PostList),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostQuery>,
) -> Result<Json<PostList>, ApiError> {
    debug!("Listing posts with filters: {:?}", query);

    let mut condition = Condition::all();

    if let Some(author_id) = query.author_id {
        condition = condition.add(post::Column::AuthorId.eq(author_id));
    }

    if let Some(ref title) = query.title {
        condition = condition.add(post::Column::Title.contains(title));
    }

    if let Some(tag_id) = query.tag_id {
        condition = condition.add(
            post::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(post_tag::Column::PostId)
                    .from(PostTag)
                    .and_where(post_tag::Column::TagId.eq(tag_id))
                    .to_owned(),
            ),
        );
    }

    if let Some(category_id) = query.category_id {
        condition = condition.add(
            post::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(post_category::Column::PostId)
                    .from(PostCategory)
                    .and_where(post_category::Column::CategoryId.eq(category_id))
                    .to_owned(),
            ),
        );
    }

    let (offset, limit) = pagination(query.offset, query.limit);

    let select = Post::find()
        .filter(condition)
        .order_by_desc(post::Column::CreatedAt);

    let total = select.clone().count(&state.db).await.map_err(db_error)? as usize;
    let page = select
        .offset(offset as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    // Batch-load links for the whole page
    let tags = page
        .load_many_to_many(Tag, PostTag, &state.db)
        .await
        .map_err(db_error)?;
    let categories = page
        .load_many_to_many(Category, PostCategory, &state.db)
        .await
        .map_err(db_error)?;

    let posts = page
        .into_iter()
        .zip(tags)
        .zip(categories)
        .map(|((model, tags), categories)| PostResponse::from_parts(model, tags, categories))
        .collect();

    Ok(Json(PostList {
        posts,
        total,
        offset,
        limit,
    }))
}

/// Get a post by id
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = Post::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Post"))?;

    Ok(Json(post_response(&state.db, post).await?))
}

/// Update a post
#[utoipa::path(
    patch,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated post", body = PostResponse),
        (status = 400, description = "Unknown tag or category id", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = Post::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Post"))?;

    if let Some(ref tag_ids) = body.tag_ids {
        ensure_tags_exist(&state.db, tag_ids).await?;
    }
    if let Some(ref category_ids) = body.category_ids {
        ensure_categories_exist(&state.db, category_ids).await?;
    }

    let mut active = post.into_active_model();
    if let Some(title) = body.title {
        active.title = Set(title);
    }
    if let Some(content) = body.content {
        active.content = Set(content);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(db_error)?;

    if let Some(ref tag_ids) = body.tag_ids {
        set_post_tags(&state.db, updated.id, tag_ids).await?;
    }
    if let Some(ref category_ids) = body.category_ids {
        set_post_categories(&state.db, updated.id, category_ids).await?;
    }

    Ok(Json(post_response(&state.db, updated).await?))
}

/// Delete a post
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 404, description = "Post not found", body = ErrorResponse)
    ),
    tag = "posts"
)]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let post = Post::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Post"))?;

    info!("Deleting post {}", post.id);
    post.delete(&state.db).await.map_err(db_error)?;

    Ok(StatusCode::NO_CONTENT)
}
