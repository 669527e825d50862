// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WebServices - Keycloak Authentication Gateway
//!
//! REST backend that logs users in against a Keycloak realm and verifies the
//! bearer tokens it hands out before routes see the caller.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Keycloak client, startup handshake, login and token verification
//! - `config` - Environment configuration
//! - `logging` - Tracing subscriber setup

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod state;

#[cfg(test)]
mod test_support;
