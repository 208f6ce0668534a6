// SPDX-License-Identifier: AGPL-3.0
// Artsy Session CLI - Main entry point
//
// Terminal frontend for the Artsy session engine: login, favorites and
// account management against the Artsy API.

mod commands;
mod state;

use anyhow::Context;
use clap::Parser;
use commands::Command;
use state::AppState;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "artsy-session", version, about)]
struct Cli {
    /// Directory holding cookies, the session snapshot and settings
    #[arg(long, global = true, env = "ARTSY_SESSION_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Override the API base URL for this run
    #[arg(long, global = true, env = "ARTSY_API_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("artsy_session_cli=info".parse()?)
                .add_directive("artsy_session_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let app_state = AppState::new(cli.data_dir, cli.base_url)
        .context("Failed to initialize application state")?;

    commands::run(&app_state, cli.command).await
}
