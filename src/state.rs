// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.
//!
//! Built once in `main` from [`AppConfig`] and cloned into every handler.
//! The provider clients share one pooled HTTP client; all of it is released
//! when the server future completes and the last clone is dropped.

use std::sync::Arc;

use crate::auth::{JwksManager, TokenVerifier};
use crate::config::AppConfig;
use crate::provider::{AdminApi, KeycloakAdminClient, OidcClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub oidc: OidcClient,
    pub verifier: TokenVerifier,
    pub admin: Arc<dyn AdminApi>,
}

impl AppState {
    /// Construct the provider clients described by `config`.
    pub fn from_config(config: AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let provider = &config.provider;
        let jwks = JwksManager::new(provider.jwks_uri(), provider.issuer(), http.clone())
            .with_cache_ttl(config.jwks_cache_ttl);
        let audience = config
            .verify_audience
            .then(|| provider.client_id.clone());
        let verifier = TokenVerifier::new(jwks, provider.issuer()).with_audience(audience);

        let oidc = OidcClient::new(provider.clone(), http.clone());
        let admin: Arc<dyn AdminApi> = Arc::new(KeycloakAdminClient::new(provider.clone(), http));

        Ok(Self {
            config: Arc::new(config),
            oidc,
            verifier,
            admin,
        })
    }

    /// Replace the admin API implementation.
    pub fn with_admin(mut self, admin: Arc<dyn AdminApi>) -> Self {
        self.admin = admin;
        self
    }

    /// Client ID whose roles gate the API.
    pub fn client_id(&self) -> &str {
        &self.config.provider.client_id
    }
}
