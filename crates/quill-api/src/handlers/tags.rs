//! Tag CRUD endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use quill_db::entities::{prelude::Tag, tag};

use crate::models::*;
use crate::AppState;

/// Create a tag
#[utoipa::path(
    post,
    path = "/api/tags",
    request_body = NameRequest,
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 409, description = "Tag name already exists", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NameRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let taken = Tag::find()
        .filter(tag::Column::Name.eq(&body.name))
        .one(&state.db)
        .await
        .map_err(db_error)?;

    if taken.is_some() {
        return Err(conflict("Tag name already exists"));
    }

    let now = Utc::now();
    let created = tag::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(body.name),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// List tags
#[utoipa::path(
    get,
    path = "/api/tags",
    params(
        ("name" = Option<String>, Query, description = "Filter by name (partial match)"),
        ("offset" = Option<usize>, Query, description = "Pagination offset (default: 0)"),
        ("limit" = Option<usize>, Query, description = "Pagination limit (default: 100, max: 1000)")
    ),
    responses(
        (status = 200, description = "List of tags", body = TagList),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<TagList>, ApiError> {
    debug!("Listing tags with filters: {:?}", query);

    let mut condition = Condition::all();

    if let Some(ref name) = query.name {
        condition = condition.add(tag::Column::Name.contains(name));
    }

    let (offset, limit) = pagination(query.offset, query.limit);

    let select = Tag::find()
        .filter(condition)
        .order_by_asc(tag::Column::Name);

    let total = select.clone().count(&state.db).await.map_err(db_error)? as usize;
    let page = select
        .offset(offset as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(TagList {
        tags: page.into_iter().map(TagResponse::from).collect(),
        total,
        offset,
        limit,
    }))
}

/// Get a tag by id
#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag", body = TagResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TagResponse>, ApiError> {
    let tag = Tag::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Tag"))?;

    Ok(Json(tag.into()))
}

/// Rename a tag
#[utoipa::path(
    patch,
    path = "/api/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Updated tag", body = TagResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse),
        (status = 409, description = "Tag name already exists", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<NameRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let tag = Tag::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Tag"))?;

    let taken = Tag::find()
        .filter(tag::Column::Name.eq(&body.name))
        .filter(tag::Column::Id.ne(id))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if taken.is_some() {
        return Err(conflict("Tag name already exists"));
    }

    let mut active = tag.into_active_model();
    active.name = Set(body.name);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(db_error)?;

    Ok(Json(updated.into()))
}

/// Delete a tag
#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let tag = Tag::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Tag"))?;

    tag.delete(&state.db).await.map_err(db_error)?;

    Ok(StatusCode::NO_CONTENT)
}
