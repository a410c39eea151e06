// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource constraint daemon and operator tool (rcd)

use anyhow::Result;
use clap::Parser;
use rc_daemon::commands::{self, Cli, Command, Context};
use rc_daemon::{setup_logging, state_dir, DaemonConfig, Paths};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => state_dir()?,
    };
    let config = DaemonConfig::load(cli.config.as_deref(), &state_dir)?;
    let paths = Paths::resolve(&state_dir, &config);

    // Only the long-running loop logs at info; one-shot commands keep
    // stderr quiet unless RUST_LOG says otherwise
    let (log_path, default_filter) = match cli.command {
        Command::Run => (paths.log.as_deref(), "info"),
        _ => (None, "warn"),
    };
    let _log_guard = setup_logging(log_path, default_filter)?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
    };

    let ctx = Context {
        paths,
        config,
        json: cli.json,
    };
    commands::execute(&ctx, cli.command, shutdown).await
}
