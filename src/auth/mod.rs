// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module fronts a Keycloak realm for the WebServices API.
//!
//! ## Auth Flow
//!
//! 1. At startup the server fetches the realm public key (retried, see
//!    [`handshake`]) and refuses to serve until it has one
//! 2. `POST /v1/login/token` exchanges a username/password with Keycloak and
//!    hands the access token back as a JSON body and an `HttpOnly` cookie
//! 3. Clients send `Authorization: Bearer <token>` on protected routes
//! 4. The server verifies the token locally against the realm key:
//!    - signature (RS/PS family), expiry and optionally audience
//!    - strict claim schema
//!    - `preferred_username` / `email` → [`Identity`]
//!
//! ## Security
//!
//! - The realm key is fetched once and never refreshed at runtime
//! - Signature verification can only be disabled in `dev` builds
//! - Clock skew tolerance is 60 seconds
//! - Error responses carry a public message only; detail goes to the log

pub mod claims;
pub mod error;
pub mod extractor;
pub mod handshake;
pub mod keys;
pub mod login;
pub mod provider;
pub mod verify;

pub use claims::{DecodedClaims, Identity, TokenBundle};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use handshake::{establish_trust, HandshakeError, RetryPolicy};
pub use keys::SigningKey;
pub use login::LoginSession;
pub use provider::{ProviderClient, ProviderError};

use crate::config::DecodeOptions;

/// Everything a request needs to authenticate a caller.
///
/// Built once after the startup handshake and shared read-only behind an
/// `Arc` in [`crate::state::AppState`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    provider: ProviderClient,
    signing_key: SigningKey,
    options: DecodeOptions,
}

impl AuthContext {
    pub fn new(provider: ProviderClient, signing_key: SigningKey, options: DecodeOptions) -> Self {
        Self {
            provider,
            signing_key,
            options,
        }
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn decode_options(&self) -> &DecodeOptions {
        &self.options
    }
}
