// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup (a `.env` file
//! is loaded first when present) and shared through `AppState`.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `KEYCLOAK_SERVER_URL` | Identity provider base URL | `http://localhost:8080` |
//! | `KEYCLOAK_REALM` | Realm name | Required |
//! | `KEYCLOAK_CLIENT_ID` | OIDC client ID | Required |
//! | `KEYCLOAK_CLIENT_SECRET` | OIDC client secret | Required |
//! | `CALLBACK_URL` | Redirect URI registered with the provider | Required |
//! | `FRONTEND_URL` | Allowed CORS origin | `http://localhost:3000` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `OIDC_SCOPE` | Scopes requested at login | `openid email roles` |
//! | `OIDC_PKCE_ENABLED` | Send a PKCE S256 challenge | `false` |
//! | `OIDC_VERIFY_AUDIENCE` | Require access-token `aud` to equal the client ID | `false` |
//! | `JWKS_CACHE_TTL_SECS` | JWKS cache lifetime, `0` refetches on every request | `0` |
//! | `SESSION_TTL_SECS` | Session inactivity expiry | `3600` |
//! | `COOKIE_SECURE` | Mark token cookies `Secure` | `false` |
//! | `HTTP_TIMEOUT_SECS` | Timeout for calls to the provider | `10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::time::Duration;

pub const KEYCLOAK_SERVER_URL_ENV: &str = "KEYCLOAK_SERVER_URL";
pub const KEYCLOAK_REALM_ENV: &str = "KEYCLOAK_REALM";
pub const KEYCLOAK_CLIENT_ID_ENV: &str = "KEYCLOAK_CLIENT_ID";
pub const KEYCLOAK_CLIENT_SECRET_ENV: &str = "KEYCLOAK_CLIENT_SECRET";
pub const CALLBACK_URL_ENV: &str = "CALLBACK_URL";
pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const OIDC_SCOPE_ENV: &str = "OIDC_SCOPE";
pub const OIDC_PKCE_ENABLED_ENV: &str = "OIDC_PKCE_ENABLED";
pub const OIDC_VERIFY_AUDIENCE_ENV: &str = "OIDC_VERIFY_AUDIENCE";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const HTTP_TIMEOUT_ENV: &str = "HTTP_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SCOPE: &str = "openid email roles";
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Identity provider (Keycloak realm and client) settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:8080`
    pub server_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
}

impl ProviderConfig {
    /// `{server_url}/realms/{realm}`, the `iss` claim of realm tokens.
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.server_url, self.realm)
    }

    fn openid_connect_endpoint(&self, name: &str) -> String {
        format!("{}/protocol/openid-connect/{name}", self.issuer())
    }

    pub fn authorization_endpoint(&self) -> String {
        self.openid_connect_endpoint("auth")
    }

    pub fn token_endpoint(&self) -> String {
        self.openid_connect_endpoint("token")
    }

    pub fn jwks_uri(&self) -> String {
        self.openid_connect_endpoint("certs")
    }

    /// `{server_url}/admin/realms/{realm}`
    pub fn admin_base(&self) -> String {
        format!("{}/admin/realms/{}", self.server_url, self.realm)
    }
}

/// Logging output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub callback_url: String,
    pub frontend_url: String,
    pub host: String,
    pub port: u16,
    pub scope: String,
    pub pkce_enabled: bool,
    pub verify_audience: bool,
    /// `None` fetches the JWKS on every verification.
    pub jwks_cache_ttl: Option<Duration>,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub http_timeout: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let server_url = get(KEYCLOAK_SERVER_URL_ENV)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let provider = ProviderConfig {
            server_url,
            realm: required(KEYCLOAK_REALM_ENV)?,
            client_id: required(KEYCLOAK_CLIENT_ID_ENV)?,
            client_secret: required(KEYCLOAK_CLIENT_SECRET_ENV)?,
        };

        let callback_url = required(CALLBACK_URL_ENV)?;
        url::Url::parse(&callback_url).map_err(|_| ConfigError::Invalid {
            name: CALLBACK_URL_ENV,
            value: callback_url.clone(),
        })?;

        let port = match get(PORT_ENV) {
            Some(raw) => parse_value(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };

        let jwks_cache_secs: u64 = match get(JWKS_CACHE_TTL_ENV) {
            Some(raw) => parse_value(JWKS_CACHE_TTL_ENV, &raw)?,
            None => 0,
        };

        let session_ttl_secs: u64 = match get(SESSION_TTL_ENV) {
            Some(raw) => parse_value(SESSION_TTL_ENV, &raw)?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let http_timeout_secs: u64 = match get(HTTP_TIMEOUT_ENV) {
            Some(raw) => parse_value(HTTP_TIMEOUT_ENV, &raw)?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None => LogFormat::Pretty,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: LOG_FORMAT_ENV,
                        value: raw.to_string(),
                    })
                }
            },
        };

        Ok(Self {
            provider,
            callback_url,
            frontend_url: get(FRONTEND_URL_ENV)
                .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            scope: get(OIDC_SCOPE_ENV).unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            pkce_enabled: parse_flag(OIDC_PKCE_ENABLED_ENV, get(OIDC_PKCE_ENABLED_ENV))?,
            verify_audience: parse_flag(OIDC_VERIFY_AUDIENCE_ENV, get(OIDC_VERIFY_AUDIENCE_ENV))?,
            jwks_cache_ttl: (jwks_cache_secs > 0).then(|| Duration::from_secs(jwks_cache_secs)),
            session_ttl: Duration::from_secs(session_ttl_secs),
            cookie_secure: parse_flag(COOKIE_SECURE_ENV, get(COOKIE_SECURE_ENV))?,
            http_timeout: Duration::from_secs(http_timeout_secs),
            log_format,
        })
    }

    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn parse_flag(name: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw {
        None => Ok(false),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}
