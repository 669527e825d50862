// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use webservices_server::{
    api::{cors_layer, router, ApiInfo},
    auth::{establish_trust, AuthContext, ProviderClient},
    config::Config,
    logging,
    state::AppState,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.logging);
    for warning in &config.warnings {
        warn!("{warning}");
    }
    info!(provider = ?config.provider, "Configuration loaded");
    if !config.provider.decode_options.verify_signature {
        warn!("Token signature verification is DISABLED (dev build)");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_shutdown_signals(shutdown.clone()));

    let provider = match ProviderClient::new(&config.provider) {
        Ok(provider) => provider,
        Err(e) => {
            error!(error = %e, "Failed to build identity provider client");
            return ExitCode::FAILURE;
        }
    };

    // The server must not accept traffic without the realm key.
    let signing_key = match establish_trust(&provider, config.handshake, &shutdown).await {
        Ok(key) => key,
        Err(e) => {
            error!(error = %e, "Startup handshake failed, exiting");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState::new(AuthContext::new(
        provider,
        signing_key,
        config.provider.decode_options,
    ));
    let cors = match cors_layer(&config.server.cors_origins) {
        Ok(cors) => cors,
        Err(e) => {
            error!(error = %e, "Invalid CORS origin");
            return ExitCode::FAILURE;
        }
    };
    let info = ApiInfo {
        title: config.server.project_name.clone(),
        version: config.server.project_version.clone(),
    };
    let app = router(state, cors, info);

    let addr = (config.server.host.as_str(), config.server.port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(host = %config.server.host, port = config.server.port, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    match listener.local_addr() {
        Ok(local) => info!(%local, "WebServices server listening (docs at /docs)"),
        Err(_) => info!("WebServices server listening (docs at /docs)"),
    }

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        error!(error = %e, "HTTP server failed");
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn watch_shutdown_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
