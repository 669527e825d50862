// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Startup Handshake
//!
//! Fetches the realm signing key before the server accepts traffic. The
//! identity provider may come up after this service in a multi-container
//! deployment, so the fetch is retried a bounded number of times with a
//! fixed wait in between.
//!
//! The handshake never exits the process itself. It returns a typed result
//! and the binary decides to abort.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{keys::SigningKey, provider::ProviderClient};

/// Bounded fixed-interval retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included.
    pub attempts: u32,
    /// Pause between two consecutive attempts.
    pub wait: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("identity provider unreachable after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("startup handshake cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

/// Fetch the signing key, retrying per `policy` until it succeeds, the budget
/// runs out, or `shutdown` fires.
pub async fn establish_trust(
    provider: &ProviderClient,
    policy: RetryPolicy,
    shutdown: &CancellationToken,
) -> Result<SigningKey, HandshakeError> {
    let mut last_error = String::from("no attempt was made");

    for attempt in 1..=policy.attempts {
        let result = tokio::select! {
            result = provider.fetch_public_key() => result,
            _ = shutdown.cancelled() => return Err(HandshakeError::Cancelled { attempts: attempt }),
        };

        match result {
            Ok(key) => {
                info!(
                    attempt,
                    realm_url = %provider.realm_url(),
                    "Successfully connected to identity provider"
                );
                return Ok(key);
            }
            Err(e) => {
                warn!(
                    attempt,
                    remaining = policy.attempts - attempt,
                    realm_url = %provider.realm_url(),
                    error = %e,
                    "Failed to connect to identity provider"
                );
                last_error = e.to_string();
            }
        }

        if attempt < policy.attempts {
            tokio::select! {
                _ = tokio::time::sleep(policy.wait) => {},
                _ = shutdown.cancelled() => return Err(HandshakeError::Cancelled { attempts: attempt }),
            }
        }
    }

    error!(
        attempts = policy.attempts,
        realm_url = %provider.realm_url(),
        "Identity provider never became reachable"
    );
    Err(HandshakeError::Exhausted {
        attempts: policy.attempts,
        last_error,
    })
}
