// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Provider admin API: users, clients and role mappings.
//!
//! [`AdminApi`] is the seam handlers and services depend on.
//! [`KeycloakAdminClient`] implements it over the Keycloak REST admin API,
//! authenticating as the client's service account (client-credentials grant).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{check_status, ProviderError};
use crate::config::ProviderConfig;

/// Page size used when listing users.
const USERS_PAGE_SIZE: usize = 100;

/// Seconds subtracted from the service token lifetime before it is renewed.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 30;

/// User entity as exchanged with the admin API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialRepresentation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRepresentation {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub temporary: bool,
}

impl CredentialRepresentation {
    /// Non-temporary password credential.
    pub fn password(value: impl Into<String>) -> Self {
        Self {
            kind: "password".to_string(),
            value: value.into(),
            temporary: false,
        }
    }
}

/// Role definition (realm or client role).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_role: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRepresentation {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ServiceTokenResponse {
    access_token: String,
    #[serde(default = "default_service_token_lifetime")]
    expires_in: i64,
}

fn default_service_token_lifetime() -> i64 {
    300
}

/// Administrative operations on the realm.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn get_users(&self) -> Result<Vec<UserRepresentation>, ProviderError>;

    async fn get_user(&self, user_id: &str) -> Result<UserRepresentation, ProviderError>;

    /// Create a user and return its new ID.
    async fn create_user(&self, user: &UserRepresentation) -> Result<String, ProviderError>;

    async fn delete_user(&self, user_id: &str) -> Result<(), ProviderError>;

    /// Resolve a client ID (e.g. `fastapi`) to the client's internal ID.
    async fn get_client_uuid(&self, client_id: &str) -> Result<String, ProviderError>;

    /// Roles defined on a client, addressed by internal ID.
    async fn get_client_roles(&self, client_uuid: &str)
        -> Result<Vec<RoleRepresentation>, ProviderError>;

    async fn assign_client_roles(
        &self,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> Result<(), ProviderError>;
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Keycloak admin REST client.
pub struct KeycloakAdminClient {
    config: ProviderConfig,
    http: Client,
    service_token: RwLock<Option<CachedToken>>,
}

impl KeycloakAdminClient {
    pub fn new(config: ProviderConfig, http: Client) -> Self {
        Self {
            config,
            http,
            service_token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.admin_base(), path)
    }

    /// Service account token, cached until shortly before it expires.
    async fn service_token(&self) -> Result<String, ProviderError> {
        {
            let cache = self.service_token.read().await;
            if let Some(cached) = cache.as_ref() {
                if Utc::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut cache = self.service_token.write().await;
        if let Some(cached) = cache.as_ref() {
            if Utc::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let body: ServiceTokenResponse = check_status(response, "service account token")
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let lifetime = (body.expires_in - TOKEN_REFRESH_MARGIN_SECS).max(0);
        *cache = Some(CachedToken {
            token: body.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(lifetime),
        });

        Ok(body.access_token)
    }

    /// [`check_status`], dropping the cached service token when the admin
    /// API rejects it.
    async fn checked(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let result = check_status(response, resource).await;
        if let Err(ProviderError::Status { status: 401, .. }) = &result {
            tracing::warn!(resource, "admin API rejected service token, clearing cache");
            *self.service_token.write().await = None;
        }
        result
    }
}

#[async_trait]
impl AdminApi for KeycloakAdminClient {
    async fn get_users(&self) -> Result<Vec<UserRepresentation>, ProviderError> {
        let token = self.service_token().await?;
        let mut users = Vec::new();
        let mut first = 0usize;

        loop {
            let response = self
                .http
                .get(self.url("users"))
                .bearer_auth(&token)
                .query(&[("first", first), ("max", USERS_PAGE_SIZE)])
                .send()
                .await?;

            let page: Vec<UserRepresentation> = self.checked(response, "users")
                .await?
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            let fetched = page.len();
            users.extend(page);
            if fetched < USERS_PAGE_SIZE {
                break;
            }
            first += fetched;
        }

        Ok(users)
    }

    async fn get_user(&self, user_id: &str) -> Result<UserRepresentation, ProviderError> {
        let token = self.service_token().await?;
        let response = self
            .http
            .get(self.url(&format!("users/{user_id}")))
            .bearer_auth(&token)
            .send()
            .await?;

        self.checked(response, &format!("user {user_id}"))
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn create_user(&self, user: &UserRepresentation) -> Result<String, ProviderError> {
        let token = self.service_token().await?;
        let label = user
            .email
            .as_deref()
            .or(user.username.as_deref())
            .unwrap_or("user");

        let response = self
            .http
            .post(self.url("users"))
            .bearer_auth(&token)
            .json(user)
            .send()
            .await?;

        let response = self.checked(response, &format!("user {label}")).await?;

        // The new ID is only returned as the last segment of `Location`.
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("created user has no Location header".to_string())
            })
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), ProviderError> {
        let token = self.service_token().await?;
        let response = self
            .http
            .delete(self.url(&format!("users/{user_id}")))
            .bearer_auth(&token)
            .send()
            .await?;

        self.checked(response, &format!("user {user_id}")).await?;
        Ok(())
    }

    async fn get_client_uuid(&self, client_id: &str) -> Result<String, ProviderError> {
        let token = self.service_token().await?;
        let response = self
            .http
            .get(self.url("clients"))
            .bearer_auth(&token)
            .query(&[("clientId", client_id)])
            .send()
            .await?;

        let clients: Vec<ClientRepresentation> = self.checked(response, "clients")
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        clients
            .into_iter()
            .next()
            .map(|client| client.id)
            .ok_or_else(|| ProviderError::NotFound(format!("client {client_id}")))
    }

    async fn get_client_roles(
        &self,
        client_uuid: &str,
    ) -> Result<Vec<RoleRepresentation>, ProviderError> {
        let token = self.service_token().await?;
        let response = self
            .http
            .get(self.url(&format!("clients/{client_uuid}/roles")))
            .bearer_auth(&token)
            .send()
            .await?;

        self.checked(response, &format!("client {client_uuid}"))
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn assign_client_roles(
        &self,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> Result<(), ProviderError> {
        let token = self.service_token().await?;
        let response = self
            .http
            .post(self.url(&format!(
                "users/{user_id}/role-mappings/clients/{client_uuid}"
            )))
            .bearer_auth(&token)
            .json(roles)
            .send()
            .await?;

        self.checked(response, &format!("user {user_id}")).await?;
        Ok(())
    }
}
