// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and authenticated user representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::roles::Role;

/// Role list as it appears under `resource_access.<client>` and `realm_access`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleList {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims of a realm-issued access or ID token.
///
/// Well-known claims are typed; everything else the provider adds is kept in
/// `extra` so the full claim set survives verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer (`{server}/realms/{realm}`)
    #[serde(default)]
    pub iss: String,

    /// Subject (provider user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience, a string or an array of strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Value>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Authorized party (client that requested the token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Replay guard echoed from the authorization request (ID tokens)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Client roles keyed by client ID
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub resource_access: HashMap<String, RoleList>,

    /// Realm roles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RoleList>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Roles granted on `client_id`, empty if the client is absent.
    pub fn client_roles(&self, client_id: &str) -> &[String] {
        self.resource_access
            .get(client_id)
            .map(|access| access.roles.as_slice())
            .unwrap_or(&[])
    }
}

/// Authenticated caller extracted from a verified access token.
///
/// This is the type handlers receive from the auth extractors.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Provider user ID (`sub` claim), absent on some service tokens
    pub subject: Option<String>,

    pub username: Option<String>,

    /// Client roles for the configured client
    pub roles: Vec<String>,

    /// Full verified claim set
    pub claims: TokenClaims,
}

impl AuthenticatedUser {
    /// Build from verified claims, reading roles granted on `client_id`.
    pub fn from_claims(claims: TokenClaims, client_id: &str) -> Self {
        Self {
            subject: claims.sub.clone(),
            username: claims.preferred_username.clone(),
            roles: claims.client_roles(client_id).to_vec(),
            claims,
        }
    }

    /// Check if the user holds a role with the required privilege.
    pub fn has_role(&self, required: Role) -> bool {
        Role::granted_by(required, &self.roles)
    }
}
