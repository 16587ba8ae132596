//! Tutor CLI and REST API entry point.
//!
//! Binary name: `tutor`
//!
//! Parses CLI arguments, sets up tracing, then either serves the REST API
//! (`tutor serve`) or acts as a client of a running server.

mod cli;
mod client;
mod http;
mod state;
mod sweeper;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;
use tutor_observe::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "tutor", &mut std::io::stdout());
        return Ok(());
    }

    let mut tracing_options = TracingOptions::from_verbosity(cli.quiet, cli.verbose);
    if cli.log_json {
        tracing_options.format = LogFormat::Json;
    }
    tracing_options.enable_otel = cli.otel;
    init_tracing(&tracing_options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            let state = AppState::init().await?;
            cli::serve::serve(state, &host, port).await?;
        }

        Commands::Onboard(args) => {
            cli::onboard::onboard(&cli.server, args, cli.json).await?;
        }

        Commands::Chat => {
            cli::chat::loop_runner::run_chat_loop(&cli.server).await?;
        }

        Commands::Logout => {
            cli::logout::logout(&cli.server, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
