//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_MOD_PORTAL_URL: &str = "https://mods.factorio.com/api/mods";
pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";

#[derive(Parser)]
#[command(name = "factorio-status", about = "Live status daemon for Factorio headless servers")]
pub struct Cli {
    /// UDS socket path (default: $XDG_RUNTIME_DIR/factorio-status/status.sock)
    #[arg(long, short = 's', global = true, env = "FACTORIO_STATUS_SOCKET")]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the daemon (pollers + UDS server)
    Serve(ServeOpts),
    /// Print the current status from a running daemon
    Status(StatusOpts),
}

#[derive(clap::Args)]
pub struct ServeOpts {
    /// RCON host of the Factorio server
    #[arg(long, env = "FACTORIO_STATUS_RCON_HOST", default_value = "127.0.0.1")]
    pub rcon_host: String,

    #[arg(long, env = "FACTORIO_STATUS_RCON_PORT", default_value = "27015")]
    pub rcon_port: u16,

    #[arg(long, env = "FACTORIO_STATUS_RCON_PASSWORD", hide_env_values = true)]
    pub rcon_password: String,

    /// Connect and per-exchange timeout in milliseconds
    #[arg(long, env = "FACTORIO_STATUS_RCON_TIMEOUT_MS", default_value = "1000")]
    pub rcon_timeout_ms: u64,

    /// Server mods directory (contains mod-list.json). Mod pollers are disabled without it.
    #[arg(long, env = "FACTORIO_STATUS_MODS_DIRECTORY")]
    pub mods_directory: Option<PathBuf>,

    #[arg(long, env = "FACTORIO_STATUS_SERVER_NAME", default_value = "Factorio Server")]
    pub server_name: String,

    /// Public host players connect to. Skips public-IP detection when set.
    #[arg(long, env = "FACTORIO_STATUS_SERVER_HOST")]
    pub server_host: Option<String>,

    #[arg(long, env = "FACTORIO_STATUS_SERVER_PORT", default_value = "34197")]
    pub server_port: u16,

    /// Report the game password in the server config facet
    #[arg(long, env = "FACTORIO_STATUS_SHOW_PASSWORD")]
    pub show_password: bool,

    /// `/config get` options to poll (repeatable; default: the standard set)
    #[arg(long = "config-option", value_name = "OPTION")]
    pub config_options: Vec<String>,

    #[arg(long, default_value = "1000")]
    pub players_interval_ms: u64,

    #[arg(long, default_value = "1000")]
    pub admins_interval_ms: u64,

    #[arg(long, default_value = "10")]
    pub config_interval_secs: u64,

    #[arg(long, default_value = "10")]
    pub mods_interval_secs: u64,

    /// Interval for the public-IP and mod portal lookups
    #[arg(long, default_value = "3600")]
    pub remote_interval_secs: u64,

    #[arg(long, env = "FACTORIO_STATUS_MOD_PORTAL_URL", default_value = DEFAULT_MOD_PORTAL_URL)]
    pub mod_portal_url: String,

    /// Skip mod portal lookups
    #[arg(long)]
    pub no_mod_portal: bool,

    #[arg(long, env = "FACTORIO_STATUS_PUBLIC_IP_URL", default_value = DEFAULT_PUBLIC_IP_URL)]
    pub public_ip_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "10")]
    pub http_timeout_secs: u64,
}

#[derive(clap::Args, Default)]
pub struct StatusOpts {
    /// Print the raw snapshot JSON
    #[arg(long)]
    pub json: bool,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/factorio-status/status.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/factorio-status-{user}/status.sock")
}
