// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users and role gates.
//!
//! ```rust,ignore
//! async fn profile(RequireUser(user): RequireUser) -> impl IntoResponse {
//!     // user holds fastapi_user or fastapi_admin
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, AuthenticatedUser, Role};
use crate::state::AppState;

/// Extract the bearer token from the `Authorization` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidAuthHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Verify a bearer token and build the caller.
pub(crate) async fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;
    let claims = state.verifier.verify(token).await?;
    Ok(AuthenticatedUser::from_claims(claims, state.client_id()))
}

/// Extractor for authenticated users.
///
/// Reuses the user attached by the auth middleware when present; otherwise
/// verifies the bearer token itself.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let user = authenticate(&parts.headers, state).await?;
        Ok(Auth(user))
    }
}

async fn require(
    parts: &mut Parts,
    state: &AppState,
    role: Role,
) -> Result<AuthenticatedUser, AuthError> {
    let Auth(user) = Auth::from_request_parts(parts, state).await?;

    if !user.has_role(role) {
        tracing::info!(
            user_id = user.subject.as_deref().unwrap_or("-"),
            required = %role,
            "role gate refused request"
        );
        return Err(AuthError::InsufficientPermissions(role));
    }

    Ok(user)
}

/// Extractor that requires `fastapi_user` (or `fastapi_admin`).
pub struct RequireUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, Role::User).await.map(RequireUser)
    }
}

/// Extractor that requires `fastapi_admin`.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require(parts, state, Role::Admin).await.map(AdminOnly)
    }
}
