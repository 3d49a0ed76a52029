//! Authentication endpoints: login, token refresh, password change

use axum::{extract::State, Extension, Json};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use std::sync::Arc;
use tracing::{debug, info};

use quill_auth::{hash_password, verify_password, PasswordError, SubjectClaims, TokenKind};
use quill_db::entities::{author, prelude::Author};

use crate::middleware::CurrentAuthor;
use crate::models::*;
use crate::AppState;

/// Subject claims issued for an author: the username is the `sub` claim,
/// resolved back to the author row at verification time.
fn subject_claims(author: &author::Model) -> SubjectClaims {
    SubjectClaims {
        sub: author.username.clone(),
        email: author.email.clone(),
        name: author.full_name(),
    }
}

fn issue_token(
    state: &AppState,
    author: &author::Model,
    kind: TokenKind,
    ttl_secs: i64,
) -> Result<String, ApiError> {
    state
        .codec
        .encode(Duration::seconds(ttl_secs), Some(kind), subject_claims(author))
        .map_err(|e| internal_error(format!("Failed to issue token: {}", e)))
}

/// Log in with username and password
///
/// An unknown username and a wrong password are reported identically, so
/// the endpoint does not reveal which usernames exist.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let author = Author::find()
        .filter(author::Column::Username.eq(&body.username))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            debug!("Login failed: unknown username");
            unauthorized()
        })?;

    match verify_password(&body.password, &author.password_hash) {
        Ok(()) => {}
        Err(PasswordError::Mismatch) => {
            debug!("Login failed: wrong password for '{}'", author.username);
            return Err(unauthorized());
        }
        Err(e) => return Err(internal_error(format!("Password verification error: {}", e))),
    }

    let access_token = issue_token(
        &state,
        &author,
        TokenKind::Access,
        state.access_token_ttl_secs,
    )?;
    let refresh_token = issue_token(
        &state,
        &author,
        TokenKind::Refresh,
        state.refresh_token_ttl_secs,
    )?;

    info!("Author '{}' logged in", author.username);

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
///
/// Guarded by the refresh-kind authenticator; access tokens are rejected
/// here just as refresh tokens are rejected everywhere else.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Invalid, expired or wrong-kind token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAuthor(author)): Extension<CurrentAuthor>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let access_token = issue_token(
        &state,
        &author,
        TokenKind::Access,
        state.access_token_ttl_secs,
    )?;

    debug!("Issued refreshed access token for '{}'", author.username);

    Ok(Json(RefreshResponse { access_token }))
}

/// Change the authenticated author's password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 401, description = "Wrong old password or invalid token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAuthor(author)): Extension<CurrentAuthor>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    match verify_password(&body.old_password, &author.password_hash) {
        Ok(()) => {}
        Err(PasswordError::Mismatch) => {
            debug!("Password change rejected for '{}'", author.username);
            return Err(unauthorized());
        }
        Err(e) => return Err(internal_error(format!("Password verification error: {}", e))),
    }

    let new_hash =
        hash_password(&body.new_password).map_err(|e| internal_error(format!("{}", e)))?;

    let username = author.username.clone();
    let mut active = author.into_active_model();
    active.password_hash = Set(new_hash);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await.map_err(db_error)?;

    info!("Author '{}' changed password", username);

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}
