// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login state kept in the server-side session.
//!
//! The whole record lives under one session key so login and callback read
//! and write it atomically.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::provider::TokenResponse;

/// Session key holding [`OidcSession`].
pub const SESSION_KEY: &str = "oidc";

pub type SessionError = tower_sessions::session::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcSession {
    /// Value echoed back through the provider redirect
    pub state: Option<String>,
    /// Replay guard expected in the ID token
    pub nonce: Option<String>,
    pub pkce_verifier: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

impl OidcSession {
    /// Read the record, or an empty one for a fresh session.
    pub async fn load(session: &Session) -> Result<Self, SessionError> {
        Ok(session.get::<Self>(SESSION_KEY).await?.unwrap_or_default())
    }

    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        session.insert(SESSION_KEY, self).await
    }

    /// Record a pending login.
    pub fn begin_login(&mut self, state: String, nonce: String, pkce_verifier: Option<String>) {
        self.state = Some(state);
        self.nonce = Some(nonce);
        self.pkce_verifier = pkce_verifier;
    }

    /// True when `state` is exactly the value stored at login.
    pub fn state_matches(&self, state: &str) -> bool {
        self.state.as_deref() == Some(state)
    }

    /// True when a nonce was stored and `nonce` equals it.
    pub fn nonce_matches(&self, nonce: Option<&str>) -> bool {
        matches!((self.nonce.as_deref(), nonce), (Some(expected), Some(got)) if expected == got)
    }

    /// Store tokens with absolute expiry times and consume the login state.
    pub fn store_tokens(&mut self, tokens: &TokenResponse, now: DateTime<Utc>) {
        self.access_token = Some(tokens.access_token.clone());
        self.refresh_token = tokens.refresh_token.clone();
        self.token_expires_at = Some(now + Duration::seconds(tokens.expires_in));
        self.refresh_expires_at = tokens
            .refresh_token
            .as_ref()
            .map(|_| now + Duration::seconds(tokens.refresh_expires_in));
        self.state = None;
        self.nonce = None;
        self.pkce_verifier = None;
    }

    /// Expiry of the stored access token if it is still valid at `now`.
    pub fn active_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (&self.access_token, self.token_expires_at) {
            (Some(_), Some(expires_at)) if expires_at > now => Some(expires_at),
            _ => None,
        }
    }
}
