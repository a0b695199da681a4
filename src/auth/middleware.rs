// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for protected router subtrees.
//!
//! Verifies the bearer token once and attaches the [`AuthenticatedUser`] to
//! the request extensions, where the role-gate extractors pick it up.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/profile", get(profile))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_bearer));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::authenticate;
use crate::state::AppState;

/// Reject requests without a valid bearer token.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "bearer authentication failed");
            e.into_response()
        }
    }
}
