// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OpenID Connect endpoints of the realm: authorization redirect and token
//! exchange.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{check_status, ProviderError};
use crate::config::ProviderConfig;

/// Parameters of the authorization redirect.
pub struct AuthorizationRequest<'a> {
    pub redirect_uri: &'a str,
    pub scope: &'a str,
    pub state: &'a str,
    pub nonce: &'a str,
    /// S256 PKCE challenge, sent only when PKCE is enabled
    pub code_challenge: Option<&'a str>,
}

/// Token endpoint response for the authorization-code grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    #[serde(default)]
    pub refresh_expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone)]
pub struct OidcClient {
    config: ProviderConfig,
    http: Client,
}

impl OidcClient {
    pub fn new(config: ProviderConfig, http: Client) -> Self {
        Self { config, http }
    }

    /// Build the URL the browser is redirected to for login.
    pub fn authorization_url(&self, request: &AuthorizationRequest<'_>) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.config.authorization_endpoint())
            .map_err(|e| ProviderError::InvalidResponse(format!("authorization endpoint: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", request.redirect_uri)
                .append_pair("scope", request.scope)
                .append_pair("state", request.state)
                .append_pair("nonce", request.nonce);
            if let Some(challenge) = request.code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", "S256");
            }
        }

        Ok(url)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenResponse, ProviderError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }

        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(&form)
            .send()
            .await?;

        check_status(response, "token endpoint")
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}
