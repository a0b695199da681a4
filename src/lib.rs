// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Realm Gate - OpenID Connect relying-party service
//!
//! Delegates login to a Keycloak-compatible realm, keeps login state in a
//! server-side session and guards user-management endpoints with client
//! roles carried in bearer tokens.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Login flow state, bearer verification and role gates
//! - `provider` - Realm OIDC endpoints and admin API clients
//! - `services` - User management built on the admin API

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod provider;
pub mod services;
pub mod state;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
