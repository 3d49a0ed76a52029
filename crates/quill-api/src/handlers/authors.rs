//! Author CRUD endpoints

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
use tracing::{debug, info};
use uuid::Uuid;

use quill_auth::hash_password;
use quill_db::entities::{author, prelude::Author};

use crate::models::*;
use crate::AppState;

/// Sign up a new author
///
/// The only unauthenticated write endpoint; the plaintext password is
/// hashed before the row is persisted.
#[utoipa::path(
    post,
    path = "/api/authors",
    request_body = CreateAuthorRequest,
    responses(
        (status = 201, description = "Author created", body = AuthorResponse),
        (status = 409, description = "Username or email already taken", body = ErrorResponse)
    ),
    tag = "authors"
)]
pub async fn create_author(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<AuthorResponse>), ApiError> {
    let taken = Author::find()
        .filter(
            Condition::any()
                .add(author::Column::Username.eq(&body.username))
                .add(author::Column::Email.eq(&body.email)),
        )
        .one(&state.db)
        .await
        .map_err(db_error)?;

    if taken.is_some() {
        return Err(conflict("Username or email already taken"));
    }

    let password_hash =
        hash_password(&body.password).map_err(|e| internal_error(format!("{}", e)))?;

    let now = Utc::now();
    let created = author::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(body.username),
        email: Set(body.email),
        first_name: Set(body.first_name),
        last_name: Set(body.last_name),
        password_hash: Set(password_hash),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    info!("Author '{}' signed up", created.username);

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// List authors
#[utoipa::path(
    get,
    path = "/api/authors",
    params(
        ("username" = Option<String>, Query, description = "Filter by username (partial match)"),
        ("email" = Option<String>, Query, description = "Filter by email (partial match)"),
        ("offset" = Option<usize>, Query, description = "Pagination offset (default: 0)"),
        ("limit" = Option<usize>, Query, description = "Pagination limit (default: 100, max: 1000)")
    ),
    responses(
        (status = 200, description = "List of authors", body = AuthorList),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "authors"
)]
pub async fn list_authors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthorQuery>,
) -> Result<Json<AuthorList>, ApiError> {
    debug!("Listing authors with filters: {:?}", query);

    let mut condition = Condition::all();

    if let Some(ref username) = query.username {
        condition = condition.add(author::Column::Username.contains(username));
    }

    if let Some(ref email) = query.email {
        condition = condition.add(author::Column::Email.contains(email));
    }

    let (offset, limit) = pagination(query.offset, query.limit);

    let select = Author::find()
        .filter(condition)
        .order_by_asc(author::Column::Username);

    let total = select.clone().count(&state.db).await.map_err(db_error)? as usize;
    let page = select
        .offset(offset as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(AuthorList {
        authors: page.into_iter().map(AuthorResponse::from).collect(),
        total,
        offset,
        limit,
    }))
}

/// Get an author by id
#[utoipa::path(
    get,
    path = "/api/authors/{id}",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author", body = AuthorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse)
    ),
    tag = "authors"
)]
pub async fn get_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuthorResponse>, ApiError> {
    let author = Author::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Author"))?;

    Ok(Json(author.into()))
}

/// Update an author
///
/// The password field is not accepted here; password changes go through
/// the dedicated change-password endpoint so the old password is always
/// re-verified.
#[utoipa::path(
    patch,
    path = "/api/authors/{id}",
    params(("id" = Uuid, Path, description = "Author ID")),
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Updated author", body = AuthorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse),
        (status = 409, description = "Email already taken", body = ErrorResponse)
    ),
    tag = "authors"
)]
pub async fn update_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAuthorRequest>,
) -> Result<Json<AuthorResponse>, ApiError> {
    let author = Author::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Author"))?;

    if let Some(ref email) = body.email {
        let taken = Author::find()
            .filter(author::Column::Email.eq(email))
            .filter(author::Column::Id.ne(id))
            .one(&state.db)
            .await
            .map_err(db_error)?;
        if taken.is_some() {
            return Err(conflict("Email already taken"));
        }
    }

    let mut active = author.into_active_model();
    if let Some(email) = body.email {
        active.email = Set(email);
    }
    if let Some(first_name) = body.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = body.last_name {
        active.last_name = Set(last_name);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(db_error)?;

    Ok(Json(updated.into()))
}

/// Delete an author
#[utoipa::path(
    delete,
    path = "/api/authors/{id}",
    params(("id" = Uuid, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found", body = ErrorResponse)
    ),
    tag = "authors"
)]
pub async fn delete_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let author = Author::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Author"))?;

    info!("Deleting author '{}'", author.username);
    author.delete(&state.db).await.map_err(db_error)?;

    Ok(StatusCode::NO_CONTENT)
}
