//! factorio-status: live status daemon for Factorio headless servers.
//! Polls the server console over RCON plus the mods directory and a few
//! HTTP endpoints, and serves the resulting snapshot over a local socket.

use clap::Parser;

mod cli;
mod client;
mod config;
mod daemon;
mod engine;
mod error;
mod handlers;
mod poller;
mod server;
mod snapshot;
mod sources;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Serve(opts) => {
            let filter = std::env::var("FACTORIO_STATUS_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("factorio-status daemon starting");

            let config = config::EngineConfig::from_opts(&opts)?;
            daemon::run_daemon(config, &socket_path).await?;
        }
        cli::Command::Status(opts) => {
            client::cmd_status(&socket_path, opts.json).await?;
        }
    }

    Ok(())
}
