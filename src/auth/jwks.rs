// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching with optional caching.
//!
//! By default the realm key set is fetched on every verification. When a
//! cache TTL is configured the set is cached per issuer; a `kid` that is not
//! in a cached set forces one refetch before the lookup fails, so key
//! rotation on the provider is picked up immediately.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk};
use jsonwebtoken::DecodingKey;
use lru::LruCache;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::AuthError;

/// Issuers kept in the cache. One realm per service in practice.
const CACHE_CAPACITY: usize = 4;

/// Raw key set. Keys are parsed lazily so one unsupported entry (e.g. an
/// encryption key) does not break lookup of the signing key.
#[derive(Debug, Default, Deserialize)]
struct RawKeySet {
    #[serde(default)]
    keys: Vec<Value>,
}

struct CacheEntry {
    keys: Arc<Vec<Value>>,
    fetched_at: Instant,
}

/// Fetches realm signing keys and resolves them by key ID.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS endpoint of the realm
    jwks_url: String,
    /// Cache key; the issuer the keys belong to
    issuer: String,
    /// `None` disables caching
    cache_ttl: Option<Duration>,
    cache: Arc<RwLock<LruCache<String, CacheEntry>>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a manager that refetches the key set on every lookup.
    pub fn new(
        jwks_url: impl Into<String>,
        issuer: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            cache_ttl: None,
            cache: Arc::new(RwLock::new(LruCache::new(capacity))),
            client,
        }
    }

    /// Enable (`Some`) or disable (`None`) key set caching.
    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl.filter(|ttl| !ttl.is_zero());
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Key set plus whether it was served from the cache.
    async fn key_set(&self) -> Result<(Arc<Vec<Value>>, bool), AuthError> {
        if let Some(ttl) = self.cache_ttl {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.peek(&self.issuer) {
                if entry.fetched_at.elapsed() < ttl {
                    return Ok((entry.keys.clone(), true));
                }
            }
        }

        Ok((self.refresh_keys().await?, false))
    }

    /// Fetch the key set and store it when caching is enabled.
    async fn refresh_keys(&self) -> Result<Arc<Vec<Value>>, AuthError> {
        let keys = Arc::new(self.fetch_jwks().await?.keys);

        if self.cache_ttl.is_some() {
            let mut cache = self.cache.write().await;
            cache.put(
                self.issuer.clone(),
                CacheEntry {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }

        Ok(keys)
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<RawKeySet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<RawKeySet>()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))
    }

    /// Get a decoding key for the given key ID.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let (keys, cached) = self.key_set().await?;
        if let Some(jwk) = find_key(&keys, kid) {
            return jwk_to_decoding_key(jwk);
        }

        if cached {
            tracing::debug!(kid, issuer = %self.issuer, "kid not in cached JWKS, refetching");
            let keys = self.refresh_keys().await?;
            if let Some(jwk) = find_key(&keys, kid) {
                return jwk_to_decoding_key(jwk);
            }
        }

        Err(AuthError::NoMatchingKey)
    }

    /// Force refresh the key set (also used as a reachability probe).
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.refresh_keys().await.map(|_| ())
    }

    /// Check if a key set is currently cached and fresh.
    pub async fn is_cached(&self) -> bool {
        let Some(ttl) = self.cache_ttl else {
            return false;
        };
        let cache = self.cache.read().await;
        cache
            .peek(&self.issuer)
            .map(|entry| entry.fetched_at.elapsed() < ttl)
            .unwrap_or(false)
    }
}

fn find_key<'a>(keys: &'a [Value], kid: &str) -> Option<&'a Value> {
    keys.iter()
        .find(|key| key.get("kid").and_then(Value::as_str) == Some(kid))
}

/// Convert a JWK to an RS256 decoding key.
fn jwk_to_decoding_key(raw: &Value) -> Result<DecodingKey, AuthError> {
    let jwk: Jwk = serde_json::from_value(raw.clone())
        .map_err(|e| AuthError::UnsupportedKey(format!("malformed JWK: {e}")))?;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| AuthError::UnsupportedKey(format!("unusable RSA key: {e}"))),
        _ => Err(AuthError::UnsupportedKey(
            "signing key is not an RSA key".to_string(),
        )),
    }
}
