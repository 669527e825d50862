// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, Identity, OptionalAuth};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Keycloak `preferred_username`
    pub username: String,
    pub email: String,
}

impl From<Identity> for UserMeResponse {
    fn from(identity: Identity) -> Self {
        Self {
            username: identity.username,
            email: identity.email,
        }
    }
}

/// Response for GET /v1/users/session
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<UserMeResponse>,
}

/// Get the current authenticated user's information.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 400, description = "Missing or malformed Authorization header"),
        (status = 401, description = "Access token invalid"),
        (status = 503, description = "Identity provider unavailable"),
    )
)]
pub async fn get_current_user(Auth(identity): Auth) -> Json<UserMeResponse> {
    Json(identity.into())
}

/// Report whether the request carries a valid session.
///
/// Anonymous callers get `authenticated: false`. A bearer token that is
/// presented but invalid is still rejected.
#[utoipa::path(
    get,
    path = "/v1/users/session",
    tag = "Users",
    security((), ("bearer" = [])),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 401, description = "Access token invalid"),
    )
)]
pub async fn get_session(OptionalAuth(identity): OptionalAuth) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: identity.is_some(),
        user: identity.map(Into::into),
    })
}
