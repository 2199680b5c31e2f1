//! Parley CLI and webhook server entry point.
//!
//! Binary name: `parley`

mod cli;
mod http;
mod state;

use clap::Parser;
use parley_observe::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, LogFormatArg};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = TracingOptions {
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        },
        enable_otel: cli.otel,
        ..TracingOptions::default()
    }
    .with_verbosity(match cli.command {
        // The server should report requests without -v.
        Commands::Serve { .. } => cli.verbose.max(1),
        _ => cli.verbose,
    });
    init_tracing(&options).map_err(|e| anyhow::anyhow!("failed to initialise tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Parley listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}/api/v1/webhook")).cyan()
            );
            println!(
                "  {}",
                console::style(format!("data dir: {}", state.data_dir.display())).dim()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Send {
            conversation_id,
            text,
            fallback,
            intent,
        } => {
            cli::turn::send(&state, &conversation_id, &text, fallback, intent, cli.json).await?;
        }

        Commands::Converse { text, token } => {
            cli::turn::converse(&state, &text, token.as_deref(), cli.json).await?;
        }

        Commands::Session { conversation_id } => {
            cli::session::show_session(&state, &conversation_id, cli.json).await?;
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("shutdown signal received");
}
