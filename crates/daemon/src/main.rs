// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::process::ExitCode;

use tend_agent::lifecycle::init_logging;
use tend_agent::{serve, startup, Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tend-agent: {e}");
            return ExitCode::FAILURE;
        }
    };
    // Dropping the guard flushes the log file
    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("tend-agent: {e}");
            return ExitCode::FAILURE;
        }
    };

    let started = match startup(&config).await {
        Ok(started) => started,
        Err(e) => {
            error!(error = %e, "failed to start agent");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let serving = tokio::spawn(serve(started, shutdown.clone()));
    shutdown_signal().await;
    info!("shutdown requested");
    shutdown.cancel();
    if let Err(e) = serving.await {
        error!(error = %e, "agent task failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Completes on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let mut terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(e) => {
            error!(error = %e, "cannot listen for SIGTERM; ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}
