// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed token verification against the realm JWKS.
//!
//! 1. Read the unverified header, require a `kid`
//! 2. Resolve the signing key by `kid` from the JWKS
//! 3. Verify RS256 signature, issuer and expiry (audience when configured)

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::TokenClaims;
use super::error::AuthError;
use super::jwks::JwksManager;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Verifies access and ID tokens issued by one realm.
#[derive(Clone)]
pub struct TokenVerifier {
    jwks: JwksManager,
    issuer: String,
    /// Expected access-token audience; `None` skips the audience check.
    audience: Option<String>,
}

impl TokenVerifier {
    pub fn new(jwks: JwksManager, issuer: impl Into<String>) -> Self {
        Self {
            jwks,
            issuer: issuer.into(),
            audience: None,
        }
    }

    /// Require access tokens to carry this audience.
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }

    /// Verify a bearer access token and return its claims.
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify_with(token, self.audience.as_deref()).await
    }

    /// Verify an ID token. ID tokens are always audience-checked against the
    /// client they were issued to.
    pub async fn verify_id_token(
        &self,
        token: &str,
        client_id: &str,
    ) -> Result<TokenClaims, AuthError> {
        self.verify_with(token, Some(client_id)).await
    }

    async fn verify_with(
        &self,
        token: &str,
        audience: Option<&str>,
    ) -> Result<TokenClaims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let decoding_key = self.jwks.get_decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_exp = true;
        validation.set_issuer(&[&self.issuer]);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, kid = %kid, "token rejected");
            AuthError::from_jwt(&e)
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{access_claims, jwks_document, now, sign_token, TEST_KID};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CERTS_PATH: &str = "/realms/demo/protocol/openid-connect/certs";

    async fn setup() -> (MockServer, TokenVerifier) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CERTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document()))
            .mount(&server)
            .await;

        let issuer = format!("{}/realms/demo", server.uri());
        let jwks = JwksManager::new(
            format!("{}{CERTS_PATH}", server.uri()),
            issuer.clone(),
            reqwest::Client::new(),
        );
        (server, TokenVerifier::new(jwks, issuer))
    }

    #[tokio::test]
    async fn valid_token_yields_claims() {
        let (_server, verifier) = setup().await;
        let token = sign_token(
            &access_claims(verifier.issuer(), "fastapi", &["fastapi_user"]),
            Some(TEST_KID),
        );

        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.client_roles("fastapi"), ["fastapi_user".to_string()]);
    }

    #[tokio::test]
    async fn missing_kid_is_rejected() {
        let (_server, verifier) = setup().await;
        let token = sign_token(&access_claims(verifier.issuer(), "fastapi", &[]), None);

        let result = verifier.verify(&token).await;
        assert!(matches!(result, Err(AuthError::MissingKeyId)));
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let (_server, verifier) = setup().await;
        let token = sign_token(
            &access_claims(verifier.issuer(), "fastapi", &["fastapi_admin"]),
            Some("some-other-key"),
        );

        let result = verifier.verify(&token).await;
        assert!(matches!(result, Err(AuthError::NoMatchingKey)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (_server, verifier) = setup().await;
        let mut claims = access_claims(verifier.issuer(), "fastapi", &[]);
        claims["exp"] = json!(now() - 3600);
        let token = sign_token(&claims, Some(TEST_KID));

        let result = verifier.verify(&token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn foreign_issuer_is_rejected() {
        let (_server, verifier) = setup().await;
        let token = sign_token(
            &access_claims("http://evil.example.com/realms/demo", "fastapi", &[]),
            Some(TEST_KID),
        );

        let result = verifier.verify(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidIssuer)));
    }

    #[tokio::test]
    async fn tampered_payload_fails_signature() {
        let (_server, verifier) = setup().await;
        let token = sign_token(&access_claims(verifier.issuer(), "fastapi", &[]), Some(TEST_KID));
        let forged = sign_token(
            &access_claims(verifier.issuer(), "fastapi", &["fastapi_admin"]),
            Some(TEST_KID),
        );
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        let result = verifier.verify(&tampered).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn audience_ignored_unless_configured() {
        let (_server, verifier) = setup().await;
        let mut claims = access_claims(verifier.issuer(), "fastapi", &[]);
        claims["aud"] = json!("account");
        let token = sign_token(&claims, Some(TEST_KID));

        assert!(verifier.verify(&token).await.is_ok());

        let strict = verifier.clone().with_audience(Some("fastapi".to_string()));
        let result = strict.verify(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidAudience)));
    }

    #[tokio::test]
    async fn id_token_requires_client_audience() {
        let (_server, verifier) = setup().await;
        let mut claims = access_claims(verifier.issuer(), "fastapi", &[]);
        claims["aud"] = json!("fastapi");
        claims["nonce"] = json!("n-1");
        let token = sign_token(&claims, Some(TEST_KID));

        let verified = verifier.verify_id_token(&token, "fastapi").await.unwrap();
        assert_eq!(verified.nonce.as_deref(), Some("n-1"));

        let result = verifier.verify_id_token(&token, "other-client").await;
        assert!(matches!(result, Err(AuthError::InvalidAudience)));
    }

    #[tokio::test]
    async fn kid_naming_non_rsa_key_is_unauthorized() {
        let server = MockServer::start().await;
        let mut doc = jwks_document();
        doc["keys"].as_array_mut().unwrap().push(json!({
            "kid": "ec-key",
            "kty": "EC",
            "crv": "P-256",
            "alg": "ES256",
            "use": "sig",
            "x": "MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4",
            "y": "4Etl6SRW2YilurN5ZHz0H7LQAU4EatPtEvJwlEEaAtM"
        }));
        Mock::given(method("GET"))
            .and(path(CERTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc))
            .mount(&server)
            .await;

        let issuer = format!("{}/realms/demo", server.uri());
        let jwks = JwksManager::new(
            format!("{}{CERTS_PATH}", server.uri()),
            issuer.clone(),
            reqwest::Client::new(),
        );
        let verifier = TokenVerifier::new(jwks, issuer);
        let token = sign_token(
            &access_claims(verifier.issuer(), "fastapi", &["fastapi_admin"]),
            Some("ec-key"),
        );

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedKey(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "unsupported_key");
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let (_server, verifier) = setup().await;
        let result = verifier.verify("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }
}
