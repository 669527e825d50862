// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login endpoint.

use axum::{
    extract::{rejection::FormRejection, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::LoginSession,
    error::ApiError,
    state::AppState,
};

/// OAuth2 password form. Other OAuth2 form fields (`grant_type`, `scope`,
/// `client_id`, `client_secret`) are accepted and ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    /// Keycloak username, forwarded unchanged
    pub username: String,
    #[schema(format = Password)]
    pub password: String,
}

/// Log in with username and password.
///
/// On success the access token is returned in the body and set as an
/// `HttpOnly` `access_token` cookie.
#[utoipa::path(
    post,
    path = "/v1/login/token",
    tag = "Login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Logged in", body = LoginSession),
        (status = 400, description = "Login form could not be parsed"),
        (status = 401, description = "Invalid user credentials"),
        (status = 424, description = "Identity provider returned an unexpected payload"),
        (status = 503, description = "Identity provider unavailable"),
    )
)]
pub async fn login_for_access_token(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<LoginSession, Response> {
    let Form(form) = form.map_err(|e| ApiError::from(e).into_response())?;

    state
        .auth
        .login(&form.username, &form.password)
        .await
        .map_err(IntoResponse::into_response)
}
