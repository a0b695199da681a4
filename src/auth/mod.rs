// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! OpenID Connect login against the realm and bearer-token authorization for
//! the API.
//!
//! ## Login Flow
//!
//! 1. `GET /api/auth/login?state=` stores `state` and a fresh nonce in the
//!    session and redirects to the provider
//! 2. The provider redirects back to `/api/auth/callback?code=&state=`
//! 3. The server checks `state`, exchanges the code, verifies the ID token
//!    and its nonce, stores the tokens in the session and sets the
//!    `access_token` / `refresh_token` cookies
//!
//! ## Bearer Flow
//!
//! - `Authorization: Bearer <access token>`
//! - Key resolved by `kid` from the realm JWKS
//! - RS256 signature, issuer and expiry verified (audience when configured)
//! - Client roles read from `resource_access.<client_id>.roles`

pub mod claims;
pub mod cookies;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod pkce;
pub mod roles;
pub mod session;
pub mod verifier;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, RequireUser};
pub use jwks::JwksManager;
pub use roles::Role;
pub use session::OidcSession;
pub use verifier::TokenVerifier;
