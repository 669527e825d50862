// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keycloak payload schemas and the authenticated identity.
//!
//! [`TokenBundle`] and [`DecodedClaims`] are strict: a payload missing a
//! required field is rejected rather than defaulted, because that means the
//! provider is not speaking the contract this service was built against.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Tokenize a scope string such as `"openid email profile"`.
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_owned).collect()
}

/// Absent, null and empty scope fields all become an empty list.
fn deserialize_scopes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(parse_scopes).unwrap_or_default())
}

/// Keycloak emits `aud` as a string for one audience and a list for several.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(aud) => vec![aud],
        OneOrMany::Many(aud) => aud,
    })
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Successful password-grant response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: u64,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub id_token: String,
    #[serde(rename = "not-before-policy")]
    pub not_before_policy: i64,
    pub session_state: String,
    #[serde(default, deserialize_with = "deserialize_scopes")]
    pub scope: Vec<String>,
}

/// Role list as Keycloak nests it (`{"roles": [...]}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleMapping {
    pub roles: Vec<String>,
}

/// Verified access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecodedClaims {
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub iss: String,
    #[serde(deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Authorized party (client the token was issued to)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
    /// Session ID
    pub sid: String,
    #[serde(default, rename = "allowed-origins")]
    pub allowed_origins: Vec<String>,
    pub realm_access: RoleMapping,
    pub resource_access: BTreeMap<String, RoleMapping>,
    #[serde(default, deserialize_with = "deserialize_scopes")]
    pub scope: Vec<String>,
    pub email_verified: bool,
    pub name: String,
    pub preferred_username: String,
    pub given_name: String,
    pub family_name: String,
    pub email: String,
}

impl DecodedClaims {
    pub fn realm_roles(&self) -> &[String] {
        &self.realm_access.roles
    }

    /// Client roles granted for `resource`, empty when none.
    pub fn resource_roles(&self, resource: &str) -> &[String] {
        self.resource_access
            .get(resource)
            .map(|mapping| mapping.roles.as_slice())
            .unwrap_or_default()
    }

    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.exp, 0)
    }
}

const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("preferred_username is empty")]
    EmptyUsername,
    #[error("preferred_username exceeds 64 characters")]
    UsernameTooLong,
    #[error("email '{0}' is not a valid address")]
    InvalidEmail(String),
}

/// The authenticated caller as seen by route handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub username: String,
    pub email: String,
}

impl TryFrom<&DecodedClaims> for Identity {
    type Error = IdentityError;

    fn try_from(claims: &DecodedClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            username: normalize_username(&claims.preferred_username)?,
            email: validate_email(&claims.email)?,
        })
    }
}

/// Strip surrounding whitespace and enforce the length limit.
fn normalize_username(raw: &str) -> Result<String, IdentityError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(IdentityError::EmptyUsername);
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(IdentityError::UsernameTooLong);
    }
    Ok(username.to_string())
}

fn validate_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim();
    let invalid = || IdentityError::InvalidEmail(email.to_string());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
    {
        return Err(invalid());
    }
    Ok(email.to_string())
}
