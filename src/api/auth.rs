// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, callback and session status endpoints.

use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::cookies::{token_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::pkce::PkcePair;
use crate::auth::session::SessionError;
use crate::auth::OidcSession;
use crate::error::ApiError;
use crate::provider::AuthorizationRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct LoginQuery {
    /// Opaque value echoed back on the callback (usually the page to return to)
    #[serde(default = "default_login_state")]
    pub state: String,
}

fn default_login_state() -> String {
    "/".to_string()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: String,
    /// Set by the provider when the user denied or the request was invalid
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallbackResponse {
    pub access_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub expires_at: DateTime<Utc>,
}

fn session_error(err: SessionError) -> ApiError {
    ApiError::internal(format!("Session error: {err}"))
}

/// Start the authorization-code flow.
#[utoipa::path(
    get,
    path = "/api/auth/login",
    tag = "Auth",
    params(LoginQuery),
    responses(
        (status = 307, description = "Redirect to the identity provider"),
        (status = 500, description = "Login could not be started")
    )
)]
pub async fn login(
    State(app): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, ApiError> {
    let nonce = Uuid::new_v4().to_string();
    let pkce = if app.config.pkce_enabled {
        Some(PkcePair::generate()?)
    } else {
        None
    };

    let mut record = OidcSession::load(&session).await.map_err(session_error)?;
    record.begin_login(
        query.state.clone(),
        nonce.clone(),
        pkce.as_ref().map(|p| p.verifier.clone()),
    );
    record.save(&session).await.map_err(session_error)?;

    let url = app
        .oidc
        .authorization_url(&AuthorizationRequest {
            redirect_uri: &app.config.callback_url,
            scope: &app.config.scope,
            state: &query.state,
            nonce: &nonce,
            code_challenge: pkce.as_ref().map(|p| p.challenge.as_str()),
        })
        .map_err(|e| ApiError::internal(format!("Login failed: {e}")))?;

    tracing::debug!(state = %query.state, pkce = pkce.is_some(), "redirecting to identity provider");
    Ok(Redirect::temporary(url.as_str()))
}

/// Complete the authorization-code flow.
#[utoipa::path(
    get,
    path = "/api/auth/callback",
    tag = "Auth",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Tokens issued; cookies set", body = CallbackResponse),
        (status = 400, description = "State or nonce mismatch"),
        (status = 500, description = "Token exchange or verification failed")
    )
)]
pub async fn callback(
    State(app): State<AppState>,
    session: Session,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Json<CallbackResponse>), ApiError> {
    if let Some(error) = query.error.as_deref() {
        let detail = query.error_description.as_deref().unwrap_or(error);
        tracing::info!(error, "provider reported authorization failure");
        return Err(ApiError::bad_request(format!("Authorization failed: {detail}")));
    }
    let code = query
        .code
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let mut record = OidcSession::load(&session).await.map_err(session_error)?;
    if !record.state_matches(&query.state) {
        tracing::warn!("callback state does not match session");
        return Err(ApiError::bad_request("Invalid state"));
    }

    let tokens = app
        .oidc
        .exchange_code(code, &app.config.callback_url, record.pkce_verifier.as_deref())
        .await
        .map_err(|e| ApiError::internal(format!("Callback failed: {e}")))?;

    let id_token = tokens
        .id_token
        .as_deref()
        .ok_or_else(|| ApiError::internal("Callback failed: token response has no id_token"))?;
    let id_claims = app
        .verifier
        .verify_id_token(id_token, app.client_id())
        .await
        .map_err(|e| ApiError::internal(format!("Callback failed: {e}")))?;

    if !record.nonce_matches(id_claims.nonce.as_deref()) {
        tracing::warn!(sub = id_claims.sub.as_deref().unwrap_or("-"), "ID token nonce does not match session");
        return Err(ApiError::bad_request("Invalid nonce"));
    }

    record.store_tokens(&tokens, Utc::now());
    record.save(&session).await.map_err(session_error)?;

    let secure = app.config.cookie_secure;
    let mut jar = jar.add(token_cookie(
        ACCESS_COOKIE,
        &tokens.access_token,
        tokens.expires_in,
        secure,
    ));
    if let Some(refresh) = tokens.refresh_token.as_deref() {
        jar = jar.add(token_cookie(
            REFRESH_COOKIE,
            refresh,
            tokens.refresh_expires_in,
            secure,
        ));
    }

    tracing::info!(sub = id_claims.sub.as_deref().unwrap_or("-"), "login completed");

    Ok((
        jar,
        Json(CallbackResponse {
            access_token: tokens.access_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            refresh_expires_in: tokens.refresh_expires_in,
        }),
    ))
}

/// Report whether the session holds an unexpired access token.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Session is logged in", body = SessionStatus),
        (status = 401, description = "No active login")
    )
)]
pub async fn me(session: Session) -> Result<Json<SessionStatus>, ApiError> {
    let record = OidcSession::load(&session).await.map_err(session_error)?;
    match record.active_until(Utc::now()) {
        Some(expires_at) => Ok(Json(SessionStatus {
            authenticated: true,
            expires_at,
        })),
        None => Err(ApiError::unauthorized("Not authenticated")),
    }
}
