//! CLI command definitions and dispatch for the `tutor` binary.
//!
//! Uses clap derive macros for argument parsing. `serve` runs the REST API;
//! `onboard`, `chat`, and `logout` are clients of a running server.

pub mod chat;
pub mod logout;
pub mod onboard;
pub mod serve;

use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};

/// Default server address for client commands.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// AI tutoring chat: server and terminal client.
#[derive(Parser)]
#[command(name = "tutor", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Server base URL used by client commands.
    #[arg(long, global = true, env = "TUTOR_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create your student profile and remember it on this machine.
    Onboard(onboard::OnboardArgs),

    /// Chat with your tutor in the terminal.
    Chat,

    /// End your active session and forget the stored profile id.
    Logout,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Steady-ticking spinner used while waiting on the server.
pub(crate) fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
