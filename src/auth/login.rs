// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential exchange.
//!
//! Trades a username/password for a Keycloak access token via the password
//! grant. The token is returned both in the JSON body and as an `HttpOnly`
//! session cookie. A failed exchange is never retried.

use axum::{
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{claims::TokenBundle, error::AuthError, AuthContext};

/// Name of the session cookie carrying the access token.
pub const SESSION_COOKIE: &str = "access_token";

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoginSession {
    pub access_token: String,
    /// Always `"bearer"`
    pub token_type: String,
}

impl LoginSession {
    fn from_bundle(bundle: TokenBundle) -> Self {
        Self {
            access_token: bundle.access_token,
            token_type: "bearer".to_string(),
        }
    }

    /// `Set-Cookie` value for this session.
    ///
    /// The value contains a space, so it is sent quoted
    /// (`access_token="Bearer abc"`), the same way Starlette's `set_cookie`
    /// quotes it. Clients read the unquoted value `Bearer abc`.
    pub fn cookie(&self) -> String {
        format!(
            "{SESSION_COOKIE}=\"Bearer {}\"; HttpOnly; Path=/; SameSite=Lax",
            self.access_token
        )
    }
}

impl IntoResponse for LoginSession {
    fn into_response(self) -> Response {
        let cookie = HeaderValue::from_str(&self.cookie());
        let mut response = (StatusCode::OK, Json(self)).into_response();
        match cookie {
            Ok(cookie) => {
                response.headers_mut().insert(SET_COOKIE, cookie);
            }
            // login() only builds sessions whose token is header-safe
            Err(e) => warn!(error = %e, "Access token cannot be carried in a cookie"),
        }
        response
    }
}

impl AuthContext {
    /// Exchange user credentials for an access token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSession, AuthError> {
        let raw = self
            .provider()
            .exchange_credentials(username, password)
            .await
            .inspect_err(|e| info!(username, error = %e, "Credential exchange failed"))?;

        let bundle: TokenBundle = serde_json::from_value(raw).map_err(|e| {
            AuthError::MalformedUpstreamPayload(format!("token response: {e}"))
        })?;

        if bundle.access_token.trim().is_empty() {
            return Err(AuthError::MalformedUpstreamPayload(
                "token response carries an empty access_token".to_string(),
            ));
        }
        if HeaderValue::from_str(&bundle.access_token).is_err()
            || bundle.access_token.contains(['"', ' ', ';', ','])
        {
            return Err(AuthError::MalformedUpstreamPayload(
                "access_token contains characters not allowed in a cookie".to_string(),
            ));
        }

        info!(
            username,
            expires_in = bundle.expires_in,
            scopes = ?bundle.scope,
            "User logged in"
        );
        Ok(LoginSession::from_bundle(bundle))
    }
}
