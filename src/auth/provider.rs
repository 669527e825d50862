// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keycloak client.
//!
//! Thin transport wrapper around the three operations the gateway needs from
//! the identity provider: fetch the realm public key, exchange a
//! username/password for tokens, and decode a bearer token. Every operation
//! returns a [`ProviderError`] variant instead of panicking, and every remote
//! call is bounded by the client timeout.

use std::fmt;

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, Validation};
use reqwest::{Certificate, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::keys::SigningKey;
use crate::config::{DecodeOptions, ProviderConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Signature algorithms an RSA realm key can verify.
const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Provider unreachable, timed out, answered with an unexpected status,
    /// or its key material cannot be used.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// Provider rejected the supplied user credentials.
    #[error("identity provider rejected credentials: {0}")]
    Authentication(String),

    /// Provider answered with a body that is not what the endpoint promises.
    #[error("identity provider response invalid: {0}")]
    Payload(String),

    /// Token failed signature or structural verification.
    #[error("token verification failed: {0}")]
    Signature(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Deserialize)]
struct RealmInfo {
    public_key: String,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct ProviderClient {
    realm_url: Url,
    client_id: String,
    client_secret: String,
    audience: String,
    http: Client,
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut realm_url = config.base_url.clone();
        realm_url
            .path_segments_mut()
            .map_err(|_| {
                ProviderError::Unavailable(format!("{} cannot be a base URL", config.base_url))
            })?
            .pop_if_empty()
            .extend(["realms", config.realm.as_str()]);

        let mut builder = Client::builder().timeout(config.timeout);
        if let Some(path) = &config.ca_bundle {
            let bundle = std::fs::read(path).map_err(|e| {
                ProviderError::Unavailable(format!("failed to read CA bundle {}: {e}", path.display()))
            })?;
            let certificates = Certificate::from_pem_bundle(&bundle).map_err(|e| {
                ProviderError::Unavailable(format!("invalid CA bundle {}: {e}", path.display()))
            })?;
            builder = builder.tls_built_in_root_certs(false);
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }
        let http = builder
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            realm_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            audience: config.expected_audience().to_string(),
            http,
        })
    }

    /// `{base}/realms/{realm}`.
    pub fn realm_url(&self) -> &Url {
        &self.realm_url
    }

    fn realm_endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.realm_url.clone();
        // realm_url was validated as a base URL in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    /// Fetch the realm public key.
    pub async fn fetch_public_key(&self) -> Result<SigningKey, ProviderError> {
        let response = self
            .http
            .get(self.realm_url.clone())
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("GET {} failed: {e}", self.realm_url)))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "GET {} returned {}",
                self.realm_url,
                response.status()
            )));
        }

        let realm: RealmInfo = response
            .json()
            .await
            .map_err(|e| ProviderError::Payload(format!("invalid realm document: {e}")))?;

        SigningKey::from_realm_key(&realm.public_key).map_err(|e| ProviderError::Payload(e.to_string()))
    }

    /// Exchange a username/password for a raw token response (password grant).
    ///
    /// The response is returned unparsed so that schema violations can be
    /// told apart from transport failures by the caller.
    pub async fn exchange_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Value, ProviderError> {
        let url = self.realm_endpoint(&["protocol", "openid-connect", "token"]);
        let form = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("username", username),
            ("password", password),
            ("scope", "openid"),
        ];

        let response = self
            .http
            .post(url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("POST {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_token_failure(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Payload(format!("token response is not JSON: {e}")))
    }

    /// Verify and decode a token against the realm key.
    ///
    /// `options.verify_signature = false` is only honoured in `dev` builds.
    pub fn decode(
        &self,
        token: &str,
        key: &SigningKey,
        options: &DecodeOptions,
    ) -> Result<Value, ProviderError> {
        if cfg!(feature = "dev") && !options.verify_signature {
            return self.decode_unverified(token, options);
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = RSA_ALGORITHMS.to_vec();
        validation.leeway = CLOCK_SKEW_LEEWAY;

        if options.verify_aud {
            validation.set_audience(&[&self.audience]);
        } else {
            validation.validate_aud = false;
        }
        if !options.verify_exp {
            validation.validate_exp = false;
            validation.required_spec_claims.remove("exp");
        }

        decode::<Value>(token, key.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                    ProviderError::Unavailable(format!("signing key unusable: {e}"))
                }
                _ => ProviderError::Signature(e),
            })
    }

    /// Decode without checking the signature (development only).
    ///
    /// Algorithm family, expiry and audience are still enforced per `options`.
    fn decode_unverified(
        &self,
        token: &str,
        options: &DecodeOptions,
    ) -> Result<Value, ProviderError> {
        let data = jsonwebtoken::dangerous::insecure_decode::<Value>(token)?;
        if !RSA_ALGORITHMS.contains(&data.header.alg) {
            return Err(rejected(ErrorKind::InvalidAlgorithm));
        }
        let claims = data.claims;

        if options.verify_exp {
            let exp = claims
                .get("exp")
                .and_then(Value::as_i64)
                .ok_or_else(|| rejected(ErrorKind::MissingRequiredClaim("exp".to_string())))?;
            if exp < chrono::Utc::now().timestamp() - CLOCK_SKEW_LEEWAY as i64 {
                return Err(rejected(ErrorKind::ExpiredSignature));
            }
        }

        if options.verify_aud {
            let audience_matches = match claims.get("aud") {
                Some(Value::String(aud)) => *aud == self.audience,
                Some(Value::Array(auds)) => auds
                    .iter()
                    .any(|aud| aud.as_str() == Some(self.audience.as_str())),
                _ => false,
            };
            if !audience_matches {
                return Err(rejected(ErrorKind::InvalidAudience));
            }
        }

        Ok(claims)
    }

    /// Fetch the realm's OpenID discovery document.
    pub async fn well_known(&self) -> Result<Value, ProviderError> {
        let url = self.realm_endpoint(&[".well-known", "openid-configuration"]);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("GET {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Payload(format!("discovery document is not JSON: {e}")))
    }
}

impl fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClient")
            .field("realm_url", &self.realm_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

fn rejected(kind: ErrorKind) -> ProviderError {
    ProviderError::Signature(kind.into())
}

/// Map a non-2xx token endpoint response to an error kind.
///
/// Keycloak answers bad user credentials with 401 `invalid_grant`, and some
/// account states (disabled, not fully set up) with 400 `invalid_grant`.
/// Anything else, a bad client secret included, is a server-side problem.
fn classify_token_failure(status: StatusCode, body: &str) -> ProviderError {
    let oauth_error = serde_json::from_str::<OAuthErrorResponse>(body).ok();
    let detail = oauth_error
        .as_ref()
        .map(|e| match &e.error_description {
            Some(description) => format!("{}: {description}", e.error),
            None => e.error.clone(),
        })
        .unwrap_or_else(|| format!("HTTP {status}"));

    let invalid_grant = oauth_error.as_ref().is_some_and(|e| e.error == "invalid_grant");
    match status {
        StatusCode::UNAUTHORIZED if oauth_error.as_ref().is_none_or(|e| e.error != "invalid_client") => {
            ProviderError::Authentication(detail)
        }
        StatusCode::BAD_REQUEST if invalid_grant => ProviderError::Authentication(detail),
        _ => {
            debug!(%status, body, "Token endpoint returned an unexpected status");
            ProviderError::Unavailable(format!("token endpoint returned {status}: {detail}"))
        }
    }
}
