// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: a signing key, its JWKS, realm
//! configuration pointed at a mock server and an in-memory admin API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{AppConfig, LogFormat, ProviderConfig};
use crate::provider::{AdminApi, ProviderError, RoleRepresentation, UserRepresentation};
use crate::state::AppState;

pub const TEST_KID: &str = "test-key-1";
pub const REALM: &str = "demo";
pub const CLIENT_ID: &str = "fastapi";
pub const CERTS_PATH: &str = "/realms/demo/protocol/openid-connect/certs";
pub const TOKEN_PATH: &str = "/realms/demo/protocol/openid-connect/token";

const TEST_KEY_PEM: &str = include_str!("../tests/fixtures/test_rsa_key.pem");

const TEST_KEY_N: &str = "vnKvYfgCQRGRpkpS_xqGimIy88axUsxdxmbgiqzUE_zqr0JdvyKXneZTPrl-nZAyNOFwthHQjMEaOpMq1vMyoiNe5tjrrkIbYmTIRJfwJDVMc_0iGrfN3pyo24E0DK_WR2Z19fBNuTSzInCCeO6j1IEWPPUOwWUjWbp0tkVm53lUjfmoDXixNHPWvcp91t0cW3bL2VSpjXszsar2uJiX93SrN4RZCk7RPkextvt2RvU7rEi2emyQu0N-UdKNTPtOrSme1W-2mIqqYokAzjroeJ3ia_gbkTMzzloayADpfgiNfML1rM_-UdMCelkQZ-G7lN-Tz9RrA6qfTTIWPU5LXQ";
const TEST_KEY_E: &str = "AQAB";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// JWKS document publishing the fixture key.
pub fn jwks_document() -> Value {
    json!({
        "keys": [{
            "kid": TEST_KID,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": TEST_KEY_N,
            "e": TEST_KEY_E,
        }]
    })
}

/// Sign `claims` with the fixture key, optionally stamping a `kid`.
pub fn sign_token(claims: &Value, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Access token claims for `user-1` holding `roles` on `client_id`.
pub fn access_claims(issuer: &str, client_id: &str, roles: &[&str]) -> Value {
    let issued = now();
    json!({
        "iss": issuer,
        "sub": "user-1",
        "exp": issued + 300,
        "iat": issued,
        "azp": client_id,
        "preferred_username": "alice",
        "resource_access": {
            client_id: { "roles": roles }
        }
    })
}

/// Serve the fixture JWKS from the realm certs endpoint.
pub async fn mount_jwks(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document()))
        .mount(server)
        .await;
}

pub fn test_config(server_uri: &str) -> AppConfig {
    AppConfig {
        provider: ProviderConfig {
            server_url: server_uri.trim_end_matches('/').to_string(),
            realm: REALM.to_string(),
            client_id: CLIENT_ID.to_string(),
            client_secret: "secret".to_string(),
        },
        callback_url: "http://localhost:8000/api/auth/callback".to_string(),
        frontend_url: "http://localhost:3000".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        scope: "openid email roles".to_string(),
        pkce_enabled: false,
        verify_audience: false,
        jwks_cache_ttl: None,
        session_ttl: Duration::from_secs(3600),
        cookie_secure: false,
        http_timeout: Duration::from_secs(5),
        log_format: LogFormat::Pretty,
    }
}

pub fn test_state(server_uri: &str) -> AppState {
    AppState::from_config(test_config(server_uri)).unwrap()
}

/// State wired to `admin` instead of the HTTP admin client.
pub fn test_state_with_admin(server_uri: &str, admin: Arc<InMemoryAdmin>) -> AppState {
    test_state(server_uri).with_admin(admin)
}

#[derive(Default)]
struct AdminData {
    users: HashMap<String, UserRepresentation>,
    client_roles: Vec<RoleRepresentation>,
    mappings: HashMap<String, Vec<String>>,
    next_id: u32,
}

/// Admin API backed by memory.
#[derive(Default)]
pub struct InMemoryAdmin {
    data: Mutex<AdminData>,
    fail_assignment: bool,
}

pub const CLIENT_UUID: &str = "client-uuid-1";

impl InMemoryAdmin {
    /// Realm whose client defines `fastapi_admin` and `fastapi_user`.
    pub fn with_default_roles() -> Self {
        let admin = Self::default();
        {
            let mut data = admin.data.lock().unwrap();
            data.client_roles = ["fastapi_admin", "fastapi_user"]
                .iter()
                .map(|name| RoleRepresentation {
                    id: Some(format!("role-{name}")),
                    name: name.to_string(),
                    client_role: Some(true),
                    ..Default::default()
                })
                .collect();
        }
        admin
    }

    /// Make every role assignment fail with a provider error.
    pub fn failing_assignment(mut self) -> Self {
        self.fail_assignment = true;
        self
    }

    pub fn insert_user(&self, id: &str, username: &str, email: &str) {
        let user = UserRepresentation {
            id: Some(id.to_string()),
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            enabled: Some(true),
            email_verified: Some(true),
            credentials: Vec::new(),
        };
        self.data.lock().unwrap().users.insert(id.to_string(), user);
    }

    pub fn user_count(&self) -> usize {
        self.data.lock().unwrap().users.len()
    }

    pub fn find_by_username(&self, username: &str) -> Option<UserRepresentation> {
        self.data
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned()
    }

    pub fn roles_of(&self, user_id: &str) -> Vec<String> {
        self.data
            .lock()
            .unwrap()
            .mappings
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AdminApi for InMemoryAdmin {
    async fn get_users(&self) -> Result<Vec<UserRepresentation>, ProviderError> {
        let mut users: Vec<_> = self.data.lock().unwrap().users.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn get_user(&self, user_id: &str) -> Result<UserRepresentation, ProviderError> {
        self.data
            .lock()
            .unwrap()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("user {user_id}")))
    }

    async fn create_user(&self, user: &UserRepresentation) -> Result<String, ProviderError> {
        let mut data = self.data.lock().unwrap();
        let username = user.username.clone().unwrap_or_default();
        if data
            .users
            .values()
            .any(|u| u.username.as_deref() == Some(username.as_str()))
        {
            return Err(ProviderError::Conflict(format!("user {username}")));
        }
        data.next_id += 1;
        let id = format!("new-user-{}", data.next_id);
        let mut stored = user.clone();
        stored.id = Some(id.clone());
        data.users.insert(id.clone(), stored);
        Ok(id)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), ProviderError> {
        let mut data = self.data.lock().unwrap();
        data.mappings.remove(user_id);
        data.users
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(format!("user {user_id}")))
    }

    async fn get_client_uuid(&self, client_id: &str) -> Result<String, ProviderError> {
        if client_id == CLIENT_ID {
            Ok(CLIENT_UUID.to_string())
        } else {
            Err(ProviderError::NotFound(format!("client {client_id}")))
        }
    }

    async fn get_client_roles(
        &self,
        client_uuid: &str,
    ) -> Result<Vec<RoleRepresentation>, ProviderError> {
        if client_uuid != CLIENT_UUID {
            return Err(ProviderError::NotFound(format!("client {client_uuid}")));
        }
        Ok(self.data.lock().unwrap().client_roles.clone())
    }

    async fn assign_client_roles(
        &self,
        user_id: &str,
        _client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> Result<(), ProviderError> {
        if self.fail_assignment {
            return Err(ProviderError::Status {
                status: 500,
                body: "role mapping failed".to_string(),
            });
        }
        let mut data = self.data.lock().unwrap();
        if !data.users.contains_key(user_id) {
            return Err(ProviderError::NotFound(format!("user {user_id}")));
        }
        data.mappings
            .entry(user_id.to_string())
            .or_default()
            .extend(roles.iter().map(|r| r.name.clone()));
        Ok(())
    }
}
