//! CLI command definitions for the `parley` binary.

pub mod session;
pub mod turn;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Session tracking and middleware dispatch for an NLU-driven bot.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to `{data_dir}/config.toml`).
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Pretty, global = true)]
    pub log_format: LogFormatArg,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Run one turn through the dispatcher and print the replies.
    Send {
        conversation_id: String,
        text: String,

        /// Mark the message as an NLU fallback ("didn't understand").
        #[arg(long)]
        fallback: bool,

        /// Intent name to attach.
        #[arg(long)]
        intent: Option<String>,
    },

    /// Send text straight to the NLU service.
    Converse {
        text: String,

        /// Continue an existing NLU conversation.
        #[arg(long)]
        token: Option<String>,
    },

    /// Show a tracked session.
    Session { conversation_id: String },
}
