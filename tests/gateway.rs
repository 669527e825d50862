// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::json;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, ResponseTemplate,
};

use common::*;

fn login_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/login/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn anonymous(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_returns_token_body_and_cookie() {
    let server = keycloak().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=correct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_bundle("abc")))
        .expect(1)
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let response = send(&app, login_request("grant_type=password&username=alice&password=correct")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("access_token=\"Bearer abc\""));
    assert!(cookie.contains("HttpOnly"));
    assert!(response.headers().contains_key("x-request-id"));

    let body = body_json(response).await;
    assert_eq!(body, json!({ "access_token": "abc", "token_type": "bearer" }));
}

#[tokio::test]
async fn login_with_bad_credentials_is_401() {
    let server = keycloak().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid user credentials"
        })))
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let response = send(&app, login_request("username=alice&password=wrong")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let body = body_json(response).await;
    assert_eq!(body["error_code"], "invalid_credentials");
}

#[tokio::test]
async fn login_with_malformed_bundle_is_424() {
    let server = keycloak().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "abc" })))
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let response = send(&app, login_request("username=alice&password=correct")).await;
    assert_eq!(response.status(), StatusCode::FAILED_DEPENDENCY);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn login_when_provider_fails_is_503() {
    let server = keycloak().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let response = send(&app, login_request("username=alice&password=correct")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "dependency_unavailable");
}

#[tokio::test]
async fn unparseable_login_form_never_reaches_the_provider() {
    let server = keycloak().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_bundle("abc")))
        .expect(0)
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let response = send(&app, login_request("username=alice")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unusual_usernames_are_forwarded_and_rejected_as_bad_credentials() {
    let long_name = "a".repeat(65);
    let cases = [
        (format!("username={long_name}&password=x"), format!("username={long_name}&")),
        ("username=&password=x".to_string(), "username=&".to_string()),
        // Surrounding spaces are not stripped before the exchange.
        ("username=%20alice%20&password=x".to_string(), "username=+alice+&".to_string()),
    ];

    for (form, forwarded) in cases {
        let server = keycloak().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains(forwarded.as_str()))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid user credentials"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let app = app_for(&server).await;

        let response = send(&app, login_request(&form)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{form}");
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "invalid_credentials");
        server.verify().await;
    }
}

// =============================================================================
// Protected routes
// =============================================================================

#[tokio::test]
async fn users_me_returns_identity_for_realm_token() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    let response = send(&app, bearer("GET", "/v1/users/me", &alice_token())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body, json!({ "username": "alice", "email": "alice@example.com" }));
}

#[tokio::test]
async fn auth_landing_echoes_identity() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    let response = send(&app, bearer("POST", "/v1/keycloak/auth_landing", &alice_token())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn protected_route_without_header_is_400() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    let response = send(&app, anonymous("GET", "/v1/users/me")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "missing_auth_header");
}

#[tokio::test]
async fn foreign_and_tampered_tokens_are_401() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    let foreign = mint(&keycloak_claims("alice", "alice@example.com"), FOREIGN_PRIVATE_PEM);
    let response = send(&app, bearer("GET", "/v1/users/me", &foreign)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Swap in a payload naming another user while keeping alice's signature.
    let token = alice_token();
    let parts: Vec<&str> = token.split('.').collect();
    let forged_payload = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&keycloak_claims("mallory", "mallory@example.com")).unwrap(),
    );
    let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
    let response = send(&app, bearer("GET", "/v1/users/me", &tampered)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "invalid_token");
}

#[tokio::test]
async fn token_with_unusable_email_is_409() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    let token = mint(&keycloak_claims("alice", "alice at example"), PROVIDER_PRIVATE_PEM);
    let response = send(&app, bearer("GET", "/v1/users/me", &token)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn session_route_accepts_anonymous_callers() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    let response = send(&app, anonymous("GET", "/v1/users/session")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "authenticated": false, "user": null })
    );

    let response = send(&app, bearer("GET", "/v1/users/session", &alice_token())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["username"], "alice");

    let response = send(&app, bearer("GET", "/v1/users/session", "garbage")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Keycloak diagnostics
// =============================================================================

#[tokio::test]
async fn test_token_returns_decoded_claims() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    let uri = format!("/v1/keycloak/test_token?access_token={}", alice_token());
    let response = send(&app, anonymous("POST", &uri)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["preferred_username"], "alice");
    assert_eq!(body["scope"], json!(["openid", "email", "profile"]));
    assert_eq!(body["realm_access"]["roles"][0], "offline_access");

    let response = send(&app, anonymous("POST", "/v1/keycloak/test_token")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_route_proxies_discovery_document() {
    let server = keycloak().await;
    Mock::given(method("GET"))
        .and(path(WELL_KNOWN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": format!("{}{REALM_PATH}", server.uri()),
            "grant_types_supported": ["authorization_code", "password"]
        })))
        .mount(&server)
        .await;
    let app = app_for(&server).await;

    let response = send(&app, anonymous("POST", "/v1/keycloak/test")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["grant_types_supported"][1], "password");
}

// =============================================================================
// Health and docs
// =============================================================================

#[tokio::test]
async fn readiness_follows_provider_reachability() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    // No discovery mock mounted yet: wiremock answers 404.
    let response = send(&app, anonymous("GET", "/health/ready")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["checks"]["identity_provider"], "unavailable");

    Mock::given(method("GET"))
        .and(path(WELL_KNOWN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "issuer": "x" })))
        .mount(&server)
        .await;
    let response = send(&app, anonymous("GET", "/health/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, anonymous("GET", "/health/live")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let server = keycloak().await;
    let app = app_for(&server).await;

    let response = send(&app, anonymous("GET", "/api-doc/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/v1/login/token"]["post"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer"].is_object());
}
