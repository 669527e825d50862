// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: RSA keys, claim payloads and token minting.

use std::time::Duration;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use url::Url;

use crate::auth::{AuthContext, ProviderClient, SigningKey};
use crate::config::{DecodeOptions, ProviderConfig};

pub const PROVIDER_PRIVATE_PEM: &str = include_str!("../tests/fixtures/provider_private.pem");
pub const PROVIDER_PUBLIC_PEM: &str = include_str!("../tests/fixtures/provider_public.pem");
pub const PROVIDER_PUBLIC_KEY_B64: &str = include_str!("../tests/fixtures/provider_public.b64");
pub const FOREIGN_PRIVATE_PEM: &str = include_str!("../tests/fixtures/foreign_private.pem");

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims as Keycloak issues them for a password-grant access token.
pub fn keycloak_claims(username: &str, email: &str) -> Value {
    let iat = now();
    json!({
        "exp": iat + 300,
        "iat": iat,
        "jti": "c6c84adc-8865-4d6e-b5fb-348d43ab28e9",
        "iss": "https://keycloak.localhost/realms/WebServices",
        "aud": "account",
        "sub": "e50a3-84d6-44d1-bfb3-419156de88c7",
        "typ": "Bearer",
        "azp": "webservices_api",
        "session_state": "49aef4f2-6850-41cb-bb02-159eb300e980",
        "acr": "1",
        "allowed-origins": ["http://localhost:57080/*"],
        "realm_access": { "roles": ["offline_access", "uma_authorization"] },
        "resource_access": { "account": { "roles": ["manage-account", "view-profile"] } },
        "scope": "openid email profile",
        "sid": "49aef4f2-6850-41cb-bb02-159eb300e980",
        "email_verified": true,
        "name": "Alice Liddell",
        "preferred_username": username,
        "given_name": "Alice",
        "family_name": "Liddell",
        "email": email
    })
}

pub fn mint(claims: &Value, private_pem: &str) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("fixture key");
    encode(&Header::new(Algorithm::RS256), claims, &key).expect("token")
}

pub fn signing_key() -> SigningKey {
    SigningKey::from_pem(PROVIDER_PUBLIC_PEM).expect("fixture public key")
}

pub fn provider_config(base_url: &str) -> ProviderConfig {
    let mut config = ProviderConfig::new(
        Url::parse(base_url).expect("base url"),
        "WebServices",
        "webservices_api",
        "s3cret",
    );
    config.timeout = Duration::from_secs(2);
    config
}

/// Context whose provider is never contacted (decode is local).
pub fn offline_context(options: DecodeOptions) -> AuthContext {
    let mut config = provider_config("http://127.0.0.1:9");
    config.decode_options = options;
    context_for(&config)
}

pub fn context_for(config: &ProviderConfig) -> AuthContext {
    let provider = ProviderClient::new(config).expect("provider client");
    AuthContext::new(provider, signing_key(), config.decode_options)
}
