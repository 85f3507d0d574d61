// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `golemd`: the agent daemon.
//!
//! The game-client adapter, LLM provider, and UI server are external
//! collaborators; launched bare, the daemon runs with a dry-run game
//! and an offline transport and degrades gracefully.

use golem_daemon::{attach_mind, run_engine, startup, Config, LifecycleError, OfflineTransport};
use golem_runtime::FakeGame;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("golemd: {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.state_dir) {
        eprintln!("golemd: cannot create state dir: {e}");
        return ExitCode::from(1);
    }
    let file_appender = tracing_appender::rolling::never(
        config.state_dir.clone(),
        "daemon.log",
    );
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("golemd: failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("golemd: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    let game = Arc::new(FakeGame::new());
    let state = startup(config, Arc::clone(&game)).await?;

    let shutdown = CancellationToken::new();
    attach_mind(&state.config, &state.services, OfflineTransport, shutdown.clone());

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                shutdown.cancel();
            }
        });
    }

    run_engine(Arc::clone(&state.services), shutdown, state.config.tick).await;
    state.shutdown();
    Ok(())
}
