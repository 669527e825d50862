// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! Turns an `Authorization` header into an [`Identity`]: parse the header,
//! decode the token against the realm key, parse the strict claim schema,
//! then project the identity. Exactly one attempt per request, no state.

use axum::http::HeaderValue;
use tracing::{debug, warn};

use super::{
    claims::{DecodedClaims, Identity},
    error::AuthError,
    AuthContext,
};

const BEARER: &str = "bearer";

/// Extract the token from a `Bearer <token>` header value.
///
/// The scheme keyword is matched case-insensitively.
pub fn parse_bearer(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = header
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

impl AuthContext {
    /// Verify `token` and parse its claims.
    pub fn decode_claims(&self, token: &str) -> Result<DecodedClaims, AuthError> {
        let raw = self
            .provider()
            .decode(token, self.signing_key(), self.decode_options())?;

        serde_json::from_value(raw).map_err(|e| {
            warn!(error = %e, "Verified token does not match the expected claim schema");
            AuthError::MalformedUpstreamPayload(format!("token claims: {e}"))
        })
    }

    /// Verify `token` and project the caller's identity.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode_claims(token)?;
        debug!(
            sub = %claims.sub,
            has_email = !claims.email.trim().is_empty(),
            realm_roles = ?claims.realm_roles(),
            client_roles = ?claims.resource_roles(claims.azp.as_deref().unwrap_or_default()),
            expires_at = ?claims.expires_at(),
            "Token verified"
        );

        Identity::try_from(&claims).map_err(|e| AuthError::IdentityProjection(e.to_string()))
    }
}
