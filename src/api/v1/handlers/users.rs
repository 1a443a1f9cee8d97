/*
 * Responsibility
 * - /users CRUD handlers
 * - Path/Json via extractors, DTO validation -> UserStore calls
 * - All failures are AppError; the error mapper renders the wire body
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    api::v1::dto::users::{CreateUserRequest, UpdateUserRequest, UserResponse},
    api::v1::extractors::AuthCtx,
    error::AppError,
    repos::user_repo::{NewUser, UserChanges},
    state::AppState,
};

// Lookups take the raw path segment so an unknown id (numeric, garbage, ...)
// reads as "not found" rather than a shape complaint about our UUIDs.
fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::not_found(format!("User with ID {raw} not found")))
}

pub async fn list_users(
    _auth: AuthCtx,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let rows = state.users.list().await?;
    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}

pub async fn create_user(
    _auth: AuthCtx,
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()
        .map_err(|details| AppError::validation("user payload is invalid", details))?;

    let row = state
        .users
        .create(NewUser {
            user_name: req.user_name,
            email: req.email,
            image_url: req.image_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn get_user(
    _auth: AuthCtx,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_user_id(&user_id)?;
    let row = state
        .users
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User with ID {user_id} not found")))?;

    Ok(Json(row.into()))
}

pub async fn update_user(
    _auth: AuthCtx,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_user_id(&user_id)?;

    if req.is_empty() {
        return Err(AppError::bad_argument("no fields to update"));
    }
    req.validate()
        .map_err(|details| AppError::validation("user payload is invalid", details))?;

    let row = state
        .users
        .update(
            id,
            UserChanges {
                user_name: req.user_name,
                email: req.email,
                image_url: req.image_url,
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found(format!("User with ID {user_id} not found")))?;

    Ok(Json(row.into()))
}

pub async fn delete_user(
    _auth: AuthCtx,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_user_id(&user_id)?;

    if state.users.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("User with ID {user_id} not found")))
    }
}
