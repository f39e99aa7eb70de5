//! Engine configuration: one section per facet, validated once at startup.

use std::path::PathBuf;
use std::time::Duration;

use factorio_status_core::ServerIdentity;
use factorio_status_core::config::DEFAULT_OPTIONS;
use factorio_status_rcon::RconConfig;

use crate::cli::{DEFAULT_PUBLIC_IP_URL, ServeOpts};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{poller} interval must be greater than zero")]
    ZeroInterval { poller: &'static str },

    #[error("rcon timeout must be greater than zero")]
    ZeroTimeout,

    #[error("rcon host must not be empty")]
    EmptyHost,

    #[error("server config poller needs at least one option")]
    NoConfigOptions,

    #[error("mods directory {0} does not exist")]
    MissingModsDirectory(PathBuf),

    #[error("invalid {what} url {url:?}: {detail}")]
    InvalidUrl {
        what: &'static str,
        url: String,
        detail: String,
    },
}

#[derive(Debug, Clone)]
pub struct PlayersConfig {
    pub command: String,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminsConfig {
    pub command: String,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfigConfig {
    pub options: Vec<String>,
    pub show_password: bool,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ModsConfig {
    pub directory: PathBuf,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub enum ServerIpConfig {
    /// Operator-supplied host, written once at startup.
    Static(String),
    /// Ask a public-IP echo service.
    Detect { url: String, interval: Duration },
}

#[derive(Debug, Clone)]
pub struct ModMetadataConfig {
    pub api_url: String,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub identity: ServerIdentity,
    pub rcon: RconConfig,
    pub players: PlayersConfig,
    pub admins: AdminsConfig,
    pub server_config: ServerConfigConfig,
    /// `None` disables both mod pollers.
    pub mods: Option<ModsConfig>,
    pub server_ip: ServerIpConfig,
    pub mod_metadata: Option<ModMetadataConfig>,
    pub http_timeout: Duration,
}

impl EngineConfig {
    /// Defaults for everything except the RCON endpoint. Mod pollers start disabled.
    pub fn new(rcon: RconConfig) -> Self {
        Self {
            identity: ServerIdentity::default(),
            rcon,
            players: PlayersConfig {
                command: "/players".to_string(),
                interval: Duration::from_secs(1),
            },
            admins: AdminsConfig {
                command: "/admins".to_string(),
                interval: Duration::from_secs(1),
            },
            server_config: ServerConfigConfig {
                options: DEFAULT_OPTIONS.iter().map(|o| (*o).to_string()).collect(),
                show_password: false,
                interval: Duration::from_secs(10),
            },
            mods: None,
            server_ip: ServerIpConfig::Detect {
                url: DEFAULT_PUBLIC_IP_URL.to_string(),
                interval: Duration::from_secs(3600),
            },
            mod_metadata: None,
            http_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_opts(opts: &ServeOpts) -> Result<Self, ConfigError> {
        let rcon = RconConfig::new(&opts.rcon_host, opts.rcon_port, &opts.rcon_password)
            .with_timeout(Duration::from_millis(opts.rcon_timeout_ms));
        let remote_interval = Duration::from_secs(opts.remote_interval_secs);

        let mut config = Self::new(rcon);
        config.identity = ServerIdentity {
            name: opts.server_name.clone(),
            port: opts.server_port,
        };
        config.players.interval = Duration::from_millis(opts.players_interval_ms);
        config.admins.interval = Duration::from_millis(opts.admins_interval_ms);
        config.server_config.interval = Duration::from_secs(opts.config_interval_secs);
        config.server_config.show_password = opts.show_password;
        if !opts.config_options.is_empty() {
            config.server_config.options = opts.config_options.clone();
        }
        config.mods = opts.mods_directory.as_ref().map(|directory| ModsConfig {
            directory: directory.clone(),
            interval: Duration::from_secs(opts.mods_interval_secs),
        });
        config.server_ip = match &opts.server_host {
            Some(host) => ServerIpConfig::Static(host.clone()),
            None => ServerIpConfig::Detect {
                url: opts.public_ip_url.clone(),
                interval: remote_interval,
            },
        };
        if config.mods.is_some() && !opts.no_mod_portal {
            config.mod_metadata = Some(ModMetadataConfig {
                api_url: opts.mod_portal_url.clone(),
                interval: remote_interval,
            });
        }
        config.http_timeout = Duration::from_secs(opts.http_timeout_secs);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rcon.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.rcon.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        non_zero("players", self.players.interval)?;
        non_zero("admins", self.admins.interval)?;
        non_zero("server_config", self.server_config.interval)?;
        if self.server_config.options.is_empty() {
            return Err(ConfigError::NoConfigOptions);
        }
        if let Some(mods) = &self.mods {
            non_zero("mods", mods.interval)?;
            if !mods.directory.is_dir() {
                return Err(ConfigError::MissingModsDirectory(mods.directory.clone()));
            }
        }
        if let ServerIpConfig::Detect { url, interval } = &self.server_ip {
            non_zero("server_ip", *interval)?;
            http_url("public ip", url)?;
        }
        if let Some(portal) = &self.mod_metadata {
            non_zero("mod_metadata", portal.interval)?;
            http_url("mod portal", &portal.api_url)?;
        }
        non_zero("http", self.http_timeout)?;
        Ok(())
    }
}

fn non_zero(poller: &'static str, interval: Duration) -> Result<(), ConfigError> {
    if interval.is_zero() {
        return Err(ConfigError::ZeroInterval { poller });
    }
    Ok(())
}

fn http_url(what: &'static str, url: &str) -> Result<(), ConfigError> {
    let invalid = |detail: String| ConfigError::InvalidUrl {
        what,
        url: url.to_string(),
        detail,
    };
    let parsed = reqwest::Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}
