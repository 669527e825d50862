// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{claims::RoleMapping, DecodedClaims, Identity, LoginSession},
    state::AppState,
};

pub mod health;
pub mod keycloak;
pub mod login;
pub mod users;

/// Title and version shown in the OpenAPI document.
#[derive(Debug, Clone)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "webservices".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub fn router(state: AppState, cors: CorsLayer, info: ApiInfo) -> Router {
    let v1_routes = Router::new()
        .route("/login/token", post(login::login_for_access_token))
        .route("/keycloak/auth_landing", post(keycloak::auth_landing))
        .route("/keycloak/test_token", post(keycloak::test_token))
        .route("/keycloak/test", post(keycloak::test_provider))
        .route("/users/me", get(users::get_current_user))
        .route("/users/session", get(users::get_session));

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .nest("/v1", v1_routes)
        .with_state(state);

    app.merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", openapi(info)))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id
    )
}

/// CORS policy for the configured browser origins.
///
/// Credentials are allowed so the session cookie is sent cross-origin. With
/// no origins configured, cross-origin requests are not allowed at all.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, header::InvalidHeaderValue> {
    if origins.is_empty() {
        return Ok(CorsLayer::new());
    }

    let origins = origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]))
}

/// OpenAPI document with the configured title and version.
pub fn openapi(info: ApiInfo) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = info.title;
    doc.info.version = info.version;
    doc
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        login::login_for_access_token,
        keycloak::auth_landing,
        keycloak::test_token,
        keycloak::test_provider,
        users::get_current_user,
        users::get_session,
        health::health,
        health::readiness,
        health::liveness
    ),
    components(
        schemas(
            LoginSession,
            login::LoginForm,
            Identity,
            DecodedClaims,
            RoleMapping,
            users::UserMeResponse,
            users::SessionResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Login", description = "Credential exchange"),
        (name = "Keycloak", description = "Identity provider diagnostics"),
        (name = "Users", description = "Authenticated caller"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
