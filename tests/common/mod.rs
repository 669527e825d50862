// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared harness for router tests: a mock Keycloak realm and token minting.

#![allow(dead_code)]

use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use webservices_server::{
    api::{router, ApiInfo},
    auth::{establish_trust, AuthContext, ProviderClient, RetryPolicy},
    config::ProviderConfig,
    state::AppState,
};

pub const PROVIDER_PRIVATE_PEM: &str = include_str!("../fixtures/provider_private.pem");
pub const PROVIDER_PUBLIC_KEY_B64: &str = include_str!("../fixtures/provider_public.b64");
pub const FOREIGN_PRIVATE_PEM: &str = include_str!("../fixtures/foreign_private.pem");

pub const REALM_PATH: &str = "/realms/WebServices";
pub const TOKEN_PATH: &str = "/realms/WebServices/protocol/openid-connect/token";
pub const WELL_KNOWN_PATH: &str = "/realms/WebServices/.well-known/openid-configuration";

/// Mock Keycloak serving the realm document.
pub async fn keycloak() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REALM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "realm": "WebServices",
            "public_key": PROVIDER_PUBLIC_KEY_B64.trim(),
            "token-service": format!("{}{REALM_PATH}/protocol/openid-connect", server.uri()),
        })))
        .mount(&server)
        .await;
    server
}

pub fn provider_config(base_url: &str) -> ProviderConfig {
    let mut config = ProviderConfig::new(
        Url::parse(base_url).unwrap(),
        "WebServices",
        "webservices_api",
        "s3cret",
    );
    config.timeout = Duration::from_secs(2);
    config
}

/// Run the startup handshake against `server` and build the app on top.
pub async fn app_for(server: &MockServer) -> Router {
    let config = provider_config(&server.uri());
    let provider = ProviderClient::new(&config).unwrap();
    let policy = RetryPolicy {
        attempts: 1,
        wait: Duration::from_millis(1),
    };
    let key = establish_trust(&provider, policy, &CancellationToken::new())
        .await
        .unwrap();

    let state = AppState::new(AuthContext::new(provider, key, config.decode_options));
    router(state, CorsLayer::new(), ApiInfo::default())
}

pub fn keycloak_claims(username: &str, email: &str) -> Value {
    let iat = chrono::Utc::now().timestamp();
    json!({
        "exp": iat + 300,
        "iat": iat,
        "jti": "0b7b2b8c-3d0e-4f4e-9d7a-7d4b1f7e2c11",
        "iss": "https://keycloak.localhost/realms/WebServices",
        "aud": "account",
        "sub": "7c2e4b1a-0f6d-4d8e-a3b5-2f1c9e8d7a60",
        "typ": "Bearer",
        "azp": "webservices_api",
        "session_state": "5d3a1c2b-7e8f-4a9b-8c0d-1e2f3a4b5c6d",
        "allowed-origins": ["http://localhost:57080/*"],
        "realm_access": { "roles": ["offline_access", "uma_authorization"] },
        "resource_access": { "account": { "roles": ["manage-account"] } },
        "scope": "openid email profile",
        "sid": "5d3a1c2b-7e8f-4a9b-8c0d-1e2f3a4b5c6d",
        "email_verified": true,
        "name": "Alice Liddell",
        "preferred_username": username,
        "given_name": "Alice",
        "family_name": "Liddell",
        "email": email
    })
}

pub fn mint(claims: &Value, private_pem: &str) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
}

pub fn alice_token() -> String {
    mint(&keycloak_claims("alice", "alice@example.com"), PROVIDER_PRIVATE_PEM)
}

pub fn token_bundle(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "expires_in": 300,
        "refresh_expires_in": 1800,
        "refresh_token": "r1",
        "token_type": "Bearer",
        "id_token": "id1",
        "not-before-policy": 0,
        "session_state": "s1",
        "scope": "openid email profile"
    })
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
