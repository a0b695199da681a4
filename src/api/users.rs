// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AdminOnly, RequireUser};
use crate::error::ApiError;
use crate::services::users::{self, NewUser, UserProfile, UserSummary};
use crate::state::AppState;

/// Query parameters for POST /api/user/user
#[derive(Debug, Deserialize, IntoParams)]
pub struct CreateUserQuery {
    /// Email address, also used as the username
    pub email: String,
    pub password: String,
    /// Client role to assign (e.g. `fastapi_user`)
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserResponse {
    pub id: String,
}

/// Get the calling user's profile.
#[utoipa::path(
    get,
    path = "/api/user/profile",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "User role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user_id = user
        .subject
        .as_deref()
        .ok_or_else(|| ApiError::not_found("User ID not found in token"))?;

    let profile = users::get_profile(state.admin.as_ref(), user_id)
        .await
        .map_err(|e| ApiError::provider("Failed to retrieve profile information", e))?;
    Ok(Json(profile))
}

/// List all users of the realm.
#[utoipa::path(
    get,
    path = "/api/user/users",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users", body = [UserSummary]),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = users::list_users(state.admin.as_ref())
        .await
        .map_err(|e| ApiError::provider("Failed to retrieve users", e))?;
    Ok(Json(users))
}

/// Create a user with a password and a client role.
#[utoipa::path(
    post,
    path = "/api/user/user",
    tag = "Users",
    security(("bearer" = [])),
    params(CreateUserQuery),
    responses(
        (status = 201, description = "User created", body = CreateUserResponse),
        (status = 400, description = "Requested role is not defined"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Query(query): Query<CreateUserQuery>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    let new_user = NewUser {
        email: query.email,
        password: query.password,
        first_name: query.first_name,
        last_name: query.last_name,
        roles: vec![query.role],
    };

    let id =
        users::create_user_with_password(state.admin.as_ref(), state.client_id(), &new_user).await?;

    tracing::info!(
        admin_id = admin.subject.as_deref().unwrap_or("-"),
        user_id = %id,
        "user provisioned"
    );
    Ok((StatusCode::CREATED, Json(CreateUserResponse { id })))
}
