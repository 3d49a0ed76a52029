//! Category CRUD endpoints

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

use quill_db::entities::{category, prelude::Category};

use crate::models::*;
use crate::AppState;

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = NameRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Category name already exists", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NameRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let taken = Category::find()
        .filter(category::Column::Name.eq(&body.name))
        .one(&state.db)
        .await
        .map_err(db_error)?;

    if taken.is_some() {
        return Err(conflict("Category name already exists"));
    }

    let now = Utc::now();
    let created = category::ActiveModel {
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

/// List categories
#[utoipa::path(
    get,
    path = "/api/categories",
    params(
        ("name" = Option<String>, Query, description = "Filter by name (partial match)"),
        ("offset" = Option<usize>, Query, description = "Pagination offset (default: 0)"),
        ("limit" = Option<usize>, Query, description = "Pagination limit (default: 100, max: 1000)")
    ),
    responses(
        (status = 200, description = "List of categories", body = CategoryList),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<CategoryList>, ApiError> {
    debug!("Listing categories with filters: {:?}", query);

    let mut condition = Condition::all();

    if let Some(ref name) = query.name {
        condition = condition.add(category::Column::Name.contains(name));
    }

    let (offset, limit) = pagination(query.offset, query.limit);

    let select = Category::find()
        .filter(condition)
        .order_by_asc(category::Column::Name);

    let total = select.clone().count(&state.db).await.map_err(db_error)? as usize;
    let page = select
        .offset(offset as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(CategoryList {
        categories: page.into_iter().map(CategoryResponse::from).collect(),
        total,
        offset,
        limit,
    }))
}

/// Get a category by id
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = Category::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Category"))?;

    Ok(Json(category.into()))
}

/// Rename a category
#[utoipa::path(
    patch,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = NameRequest,
    responses(
        (status = 200, description = "Updated category", body = CategoryResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Category name already exists", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<NameRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = Category::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Category"))?;

    let taken = Category::find()
        .filter(category::Column::Name.eq(&body.name))
        .filter(category::Column::Id.ne(id))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if taken.is_some() {
        return Err(conflict("Category name already exists"));
    }

    let mut active = category.into_active_model();
    active.name = Set(body.name);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(db_error)?;

    Ok(Json(updated.into()))
}

/// Delete a category
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let category = Category::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Category"))?;

    category.delete(&state.db).await.map_err(db_error)?;

    Ok(StatusCode::NO_CONTENT)
}
