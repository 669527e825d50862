// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keycloak diagnostic endpoints.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::{
    auth::{Auth, AuthError, DecodedClaims, Identity},
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TestTokenQuery {
    /// Raw access token (without the `Bearer` prefix)
    pub access_token: String,
}

/// Landing route after login: echoes the verified identity.
#[utoipa::path(
    post,
    path = "/v1/keycloak/auth_landing",
    tag = "Keycloak",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Verified identity", body = Identity),
        (status = 400, description = "Missing or malformed Authorization header"),
        (status = 401, description = "Access token invalid"),
        (status = 409, description = "Token does not describe a usable identity"),
    )
)]
pub async fn auth_landing(Auth(identity): Auth) -> Json<Identity> {
    Json(identity)
}

/// Decode an access token and return its claims.
#[utoipa::path(
    post,
    path = "/v1/keycloak/test_token",
    tag = "Keycloak",
    params(TestTokenQuery),
    responses(
        (status = 200, description = "Decoded claims", body = DecodedClaims),
        (status = 400, description = "access_token query parameter missing"),
        (status = 401, description = "Access token invalid"),
        (status = 424, description = "Claims do not match the expected schema"),
    )
)]
pub async fn test_token(
    State(state): State<AppState>,
    query: Result<Query<TestTokenQuery>, QueryRejection>,
) -> Result<Json<DecodedClaims>, Response> {
    let Query(query) = query.map_err(|e| ApiError::from(e).into_response())?;
    state
        .auth
        .decode_claims(query.access_token.trim())
        .map(Json)
        .map_err(IntoResponse::into_response)
}

/// Fetch the realm's OpenID discovery document.
#[utoipa::path(
    post,
    path = "/v1/keycloak/test",
    tag = "Keycloak",
    responses(
        (status = 200, description = "OpenID discovery document", content_type = "application/json"),
        (status = 424, description = "Discovery document is not JSON"),
        (status = 503, description = "Identity provider unavailable"),
    )
)]
pub async fn test_provider(State(state): State<AppState>) -> Result<Json<Value>, AuthError> {
    let document = state.auth.provider().well_known().await?;
    Ok(Json(document))
}
