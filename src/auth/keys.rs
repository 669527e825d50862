// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Realm signing key.
//!
//! Keycloak publishes the realm's public key as bare base64 DER on
//! `GET /realms/{realm}`. The key is wrapped in a `PUBLIC KEY` PEM envelope
//! and parsed once; the resulting [`SigningKey`] is read-only afterwards.

use std::fmt;

use base64ct::{Base64, Encoding};
use jsonwebtoken::DecodingKey;
use pem::{EncodeConfig, LineEnding, Pem};

const PEM_TAG: &str = "PUBLIC KEY";

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("realm public key is not valid base64: {0}")]
    Encoding(String),

    #[error("realm public key is not a usable RSA key: {0}")]
    Rsa(#[from] jsonwebtoken::errors::Error),
}

/// Identity provider public key used to verify bearer tokens.
#[derive(Clone)]
pub struct SigningKey {
    pem: String,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Build from the base64 DER `public_key` field of the realm endpoint.
    pub fn from_realm_key(encoded: &str) -> Result<Self, KeyError> {
        let der = Base64::decode_vec(encoded.trim()).map_err(|e| KeyError::Encoding(e.to_string()))?;
        let pem = pem::encode_config(
            &Pem::new(PEM_TAG, der),
            EncodeConfig::new().set_line_ending(LineEnding::LF),
        );
        Self::from_pem(pem)
    }

    /// Build from a complete PEM document.
    pub fn from_pem(pem: impl Into<String>) -> Result<Self, KeyError> {
        let pem = pem.into();
        let decoding = DecodingKey::from_rsa_pem(pem.as_bytes())?;
        Ok(Self { pem, decoding })
    }

    /// The PEM envelope handed to the verification routine.
    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey").field("pem", &self.pem).finish_non_exhaustive()
    }
}
