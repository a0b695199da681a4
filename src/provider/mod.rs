// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider collaborators.
//!
//! - `oidc` - authorization URL construction and the code-for-token exchange
//! - `admin` - user and role management through the provider admin API
//!
//! Both are built once at startup from [`ProviderConfig`](crate::config::ProviderConfig)
//! and shared through `AppState`.

pub mod admin;
pub mod oidc;

pub use admin::{AdminApi, KeycloakAdminClient, RoleRepresentation, UserRepresentation};
pub use oidc::{AuthorizationRequest, OidcClient, TokenResponse};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("identity provider request failed: {0}")]
    Request(String),

    #[error("identity provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("identity provider response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Request(err.to_string())
    }
}

/// Turn a non-success response into a [`ProviderError`].
///
/// `resource` names the thing being addressed for 404/409 messages.
pub(crate) async fn check_status(
    response: reqwest::Response,
    resource: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        reqwest::StatusCode::NOT_FOUND => Err(ProviderError::NotFound(resource.to_string())),
        reqwest::StatusCode::CONFLICT => Err(ProviderError::Conflict(resource.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
