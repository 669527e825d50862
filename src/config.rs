// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All configuration is resolved once at startup from the environment and is
//! treated as immutable for the lifetime of the process.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PROJECT_NAME` | OpenAPI title | `webservices` |
//! | `PROJECT_VERSION` | OpenAPI version | crate version |
//! | `BACKEND_CORS_ORIGINS` | Comma-separated allowed origins | none |
//! | `KEYCLOAK_URL` | Keycloak base URL (overrides hostname/port) | - |
//! | `KEYCLOAK_HOSTNAME` | Keycloak host | Required without `KEYCLOAK_URL` |
//! | `KC_HTTPS_PORT` | Keycloak HTTPS port | Required without `KEYCLOAK_URL` |
//! | `KEYCLOAK_REALM` | Realm name | `WebServices` |
//! | `KEYCLOAK_CLIENT_ID` | Confidential client id | `webservices_api` |
//! | `KEYCLOAK_CLIENT_SECRET_KEY` | Client secret | Required |
//! | `KEYCLOAK_AUDIENCE` | Expected `aud` claim | client id |
//! | `KEYCLOAK_VERIFY_SIGNATURE` | Verify token signatures | `true` |
//! | `KEYCLOAK_VERIFY_AUD` | Verify token audience | `false` |
//! | `KEYCLOAK_VERIFY_EXP` | Verify token expiry | `true` |
//! | `KEYCLOAK_TIMEOUT_SEC` | Per-call provider timeout | `10` |
//! | `KEYCLOAK_CA_BUNDLE` | PEM bundle replacing built-in trust roots | none |
//! | `KEYCLOAK_LOGIN_RETRY_COUNT` | Startup handshake attempts | `10` |
//! | `KEYCLOAK_LOGIN_WAIT_SEC` | Seconds between handshake attempts | `5` |
//! | `LOG_LEVEL` | `CRITICAL`/`ERROR`/`WARNING`/`INFO`/`DEBUG` | `INFO` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log filter, takes precedence over `LOG_LEVEL` | - |

use std::{fmt, path::PathBuf, time::Duration};

use url::Url;

use crate::auth::handshake::RetryPolicy;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PROJECT_NAME: &str = "webservices";
const DEFAULT_REALM: &str = "WebServices";
const DEFAULT_CLIENT_ID: &str = "webservices_api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRY_COUNT: u32 = 10;
const DEFAULT_RETRY_WAIT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub handshake: RetryPolicy,
    pub logging: LogConfig,
    /// Non-fatal problems found while parsing, reported once logging is up.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub project_name: String,
    pub project_version: String,
    pub cors_origins: Vec<String>,
}

/// Connection and verification settings for the identity provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub base_url: Url,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    /// Expected `aud` claim when `decode_options.verify_aud` is set.
    pub audience: Option<String>,
    pub decode_options: DecodeOptions,
    pub timeout: Duration,
    pub ca_bundle: Option<PathBuf>,
}

impl ProviderConfig {
    pub fn new(
        base_url: Url,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url,
            realm: realm.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            audience: None,
            decode_options: DecodeOptions::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            ca_bundle: None,
        }
    }

    /// The audience checked when audience verification is enabled.
    pub fn expected_audience(&self) -> &str {
        self.audience.as_deref().unwrap_or(&self.client_id)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url.as_str())
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("audience", &self.audience)
            .field("decode_options", &self.decode_options)
            .field("timeout", &self.timeout)
            .field("ca_bundle", &self.ca_bundle)
            .finish()
    }
}

/// Token decode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub verify_signature: bool,
    pub verify_aud: bool,
    pub verify_exp: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verify_signature: true,
            verify_aud: false,
            verify_exp: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Parse a level name case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "ERROR" => Some(Self::Error),
            "WARNING" | "WARN" => Some(Self::Warning),
            "INFO" => Some(Self::Info),
            "DEBUG" => Some(Self::Debug),
            _ => None,
        }
    }

    /// The equivalent `tracing` filter directive.
    pub fn as_directive(self) -> &'static str {
        match self {
            // tracing has no level above error
            Self::Critical | Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut warnings = Vec::new();

        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: match get("PORT") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::invalid("PORT", format!("'{raw}' is not a port")))?,
                None => DEFAULT_PORT,
            },
            project_name: get("PROJECT_NAME").unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            project_version: get("PROJECT_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            cors_origins: parse_origins(get("BACKEND_CORS_ORIGINS").as_deref())?,
        };

        let base_url = match get("KEYCLOAK_URL") {
            Some(raw) => parse_base_url("KEYCLOAK_URL", &raw)?,
            None => {
                let host = get("KEYCLOAK_HOSTNAME").ok_or(ConfigError::Missing("KEYCLOAK_HOSTNAME"))?;
                let port = get("KC_HTTPS_PORT").ok_or(ConfigError::Missing("KC_HTTPS_PORT"))?;
                parse_base_url("KEYCLOAK_HOSTNAME", &format!("https://{host}:{port}"))?
            }
        };

        let decode_options = DecodeOptions {
            verify_signature: parse_bool(&get, "KEYCLOAK_VERIFY_SIGNATURE", true)?,
            verify_aud: parse_bool(&get, "KEYCLOAK_VERIFY_AUD", false)?,
            verify_exp: parse_bool(&get, "KEYCLOAK_VERIFY_EXP", true)?,
        };
        if !decode_options.verify_signature && !cfg!(feature = "dev") {
            return Err(ConfigError::invalid(
                "KEYCLOAK_VERIFY_SIGNATURE",
                "signature verification can only be disabled in builds with the `dev` feature",
            ));
        }

        let timeout_secs = parse_number(&get, "KEYCLOAK_TIMEOUT_SEC", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::invalid("KEYCLOAK_TIMEOUT_SEC", "must be greater than 0"));
        }

        let provider = ProviderConfig {
            base_url,
            realm: get("KEYCLOAK_REALM").unwrap_or_else(|| DEFAULT_REALM.to_string()),
            client_id: get("KEYCLOAK_CLIENT_ID").unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            client_secret: get("KEYCLOAK_CLIENT_SECRET_KEY")
                .ok_or(ConfigError::Missing("KEYCLOAK_CLIENT_SECRET_KEY"))?,
            audience: get("KEYCLOAK_AUDIENCE"),
            decode_options,
            timeout: Duration::from_secs(timeout_secs),
            ca_bundle: get("KEYCLOAK_CA_BUNDLE").map(PathBuf::from),
        };

        let attempts: u32 = parse_number(&get, "KEYCLOAK_LOGIN_RETRY_COUNT", DEFAULT_RETRY_COUNT)?;
        if attempts == 0 {
            return Err(ConfigError::invalid(
                "KEYCLOAK_LOGIN_RETRY_COUNT",
                "at least one attempt is required",
            ));
        }
        let handshake = RetryPolicy {
            attempts,
            wait: Duration::from_secs(parse_number(
                &get,
                "KEYCLOAK_LOGIN_WAIT_SEC",
                DEFAULT_RETRY_WAIT_SECS,
            )?),
        };

        let level = match get("LOG_LEVEL") {
            Some(raw) => LogLevel::parse(&raw).unwrap_or_else(|| {
                warnings.push(format!("Invalid log level: {raw}. Setting LOG_LEVEL to WARNING."));
                LogLevel::Warning
            }),
            None => LogLevel::Info,
        };
        let format = match get("LOG_FORMAT").map(|f| f.to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "LOG_FORMAT",
                    format!("'{other}' is not one of json, pretty"),
                ))
            }
        };

        Ok(Self {
            server,
            provider,
            handshake,
            logging: LogConfig { level, format },
            warnings,
        })
    }
}

fn parse_base_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid(var, format!("'{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::invalid(var, format!("'{raw}' is not an http(s) URL")));
    }
    Ok(url)
}

fn parse_origins(raw: Option<&str>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            let url = parse_base_url("BACKEND_CORS_ORIGINS", origin)?;
            // Origins never carry a path; Url normalises "http://a" to "http://a/".
            Ok(url.origin().ascii_serialization())
        })
        .collect()
}

fn parse_bool<F>(get: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(var, format!("'{raw}' is not a boolean"))),
        },
    }
}

fn parse_number<F, T>(get: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::invalid(var, format!("'{raw}' is not a number"))),
    }
}
