// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every failure of the credential exchange and token verification flows ends
//! up as one of these variants. Each variant has exactly one HTTP status.
//! Internal detail is logged when the response is built and never sent to
//! the caller.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use super::provider::ProviderError;

/// Authentication error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,

    /// Authorization header is not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    /// Identity provider unreachable, or its key material unusable
    #[error("identity provider unavailable: {0}")]
    DependencyUnavailable(String),

    /// Provider rejected the username/password pair
    #[error("invalid user credentials")]
    InvalidCredentials,

    /// Signature or structural verification of a bearer token failed
    #[error("access token invalid: {0}")]
    InvalidToken(String),

    /// Provider answered with a payload that does not match the expected schema
    #[error("identity provider payload rejected: {0}")]
    MalformedUpstreamPayload(String),

    /// Token verified but its claims do not describe a usable identity
    #[error("identity projection failed: {0}")]
    IdentityProjection(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::DependencyUnavailable(_) => "dependency_unavailable",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::MalformedUpstreamPayload(_) => "malformed_upstream_payload",
            AuthError::IdentityProjection(_) => "identity_projection_failed",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::MalformedUpstreamPayload(_) => StatusCode::FAILED_DEPENDENCY,
            AuthError::IdentityProjection(_) => StatusCode::CONFLICT,
        }
    }

    /// Message returned to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => {
                "Did not receive an Authorization Bearer header with access token"
            }
            AuthError::InvalidAuthHeader => {
                "Invalid authorization header format (expected 'Bearer <token>')"
            }
            AuthError::DependencyUnavailable(_) => {
                "Failed to establish connection to authentication server"
            }
            AuthError::InvalidCredentials => "Invalid user credentials",
            AuthError::InvalidToken(_) => "Access token invalid",
            AuthError::MalformedUpstreamPayload(_) => {
                "Authentication server returned a payload the server could not parse. \
                 Please contact the administrators."
            }
            AuthError::IdentityProjection(_) => "Invalid login.",
        }
    }

    /// Whether this error belongs to the missing/malformed credential header kind.
    pub fn is_header_error(&self) -> bool {
        matches!(self, AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader)
    }
}

/// Boundary mapping from provider-client failures to request outcomes.
impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(msg) => AuthError::DependencyUnavailable(msg),
            ProviderError::Authentication(_) => AuthError::InvalidCredentials,
            ProviderError::Payload(msg) => AuthError::MalformedUpstreamPayload(msg),
            ProviderError::Signature(err) => AuthError::InvalidToken(err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(
            status = status.as_u16(),
            error_code = self.error_code(),
            detail = %self,
            "Authentication request rejected"
        );

        let body = Json(AuthErrorBody {
            error: self.public_message().to_string(),
            error_code: self.error_code().to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
