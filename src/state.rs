// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthContext;

/// Shared application state.
///
/// Only holds data that is fixed once the startup handshake has succeeded,
/// so handlers read it without locking.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthContext>,
}

impl AppState {
    pub fn new(auth: AuthContext) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }
}
