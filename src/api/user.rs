//! User API handlers

use crate::api::{MessageResponse, SuccessResponse};
use crate::domain::{CreateUserInput, UpdateUserInput};
use crate::error::Result;
use crate::security::{OptionalPrincipal, Principal};
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

/// Create user
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(user))))
}

/// Get the user bound to the calling token
pub async fn me(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Result<impl IntoResponse> {
    let user = state
        .user_service
        .resolve_current_user(principal.as_ref())
        .await?;
    let user = state.user_service.with_presigned_urls(user).await?;
    Ok(Json(SuccessResponse::new(user)))
}

/// Get user by ID
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse> {
    let user = state.user_service.get(id).await?;
    let user = state.user_service.with_presigned_urls(user).await?;
    Ok(Json(SuccessResponse::new(user)))
}

/// Update user (self-service only)
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(input): Json<UpdateUserInput>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.update(id, &principal, input).await?;
    Ok(Json(SuccessResponse::new(user)))
}

/// Delete user account (Keycloak first, then local soft delete)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.user_service.delete_account(id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[derive(Debug, Deserialize)]
pub struct GrantRoleRequest {
    pub role: String,
}

/// Grant a role to the user across all recognized realm clients
pub async fn grant_role(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(input): Json<GrantRoleRequest>,
) -> Result<impl IntoResponse> {
    state
        .user_service
        .ensure_role(&principal, id, &input.role)
        .await?;
    Ok(Json(MessageResponse::new(format!(
        "Role '{}' granted",
        input.role
    ))))
}

/// Associate a user with a gov
pub async fn associate_gov(
    State(state): State<AppState>,
    principal: Principal,
    Path((gov_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse> {
    let user = state
        .user_service
        .associate_gov(&principal, gov_id, user_id)
        .await?;
    Ok(Json(SuccessResponse::new(user)))
}
