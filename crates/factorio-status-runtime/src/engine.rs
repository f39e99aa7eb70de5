//! Engine: owns the snapshot, the shared RCON connection and every poller
//! task. `start` spawns the pollers, `stop` cancels them, waits for each
//! task to finish, then closes the connection.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use factorio_status_core::ConfigDecoders;
use factorio_status_rcon::{CommandRunner, SharedRcon};

use crate::config::{ConfigError, EngineConfig, ServerIpConfig};
use crate::error::EngineError;
use crate::handlers;
use crate::poller::{Poller, Source};
use crate::snapshot::{SnapshotReader, SnapshotWriters, new_snapshot};
use crate::sources::{
    AdminSource, CommandSource, ConfigSource, HttpSource, ModFilesSource, ModMetadataSource,
};

pub struct Engine {
    config: EngineConfig,
    reader: SnapshotReader,
    /// Taken by the first start; `None` afterwards.
    writers: Option<SnapshotWriters>,
    cancel: CancellationToken,
    tasks: Vec<(String, JoinHandle<()>)>,
    rcon: Option<SharedRcon>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (reader, writers) = new_snapshot(config.identity.clone());
        Ok(Self {
            config,
            reader,
            writers: Some(writers),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            rcon: None,
        })
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Open the RCON connection and spawn every poller.
    ///
    /// A refused connection or rejected password is returned as an error and
    /// no poller is started.
    pub async fn start(&mut self) -> Result<(), EngineError> {
        if self.writers.is_none() {
            return Err(EngineError::AlreadyStarted);
        }
        let rcon = SharedRcon::open(self.config.rcon.clone()).await?;
        tracing::info!("rcon connected to {}", rcon.config().addr());
        self.rcon = Some(rcon.clone());
        self.start_with(rcon)
    }

    /// Spawn every poller against an already connected command runner.
    pub fn start_with<R>(&mut self, runner: R) -> Result<(), EngineError>
    where
        R: CommandRunner + Clone + 'static,
    {
        let http = reqwest::Client::builder()
            .timeout(self.config.http_timeout)
            .user_agent(concat!("factorio-status/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EngineError::HttpClient)?;
        let Some(SnapshotWriters {
            players,
            admins,
            mods,
            server_config,
            server_ip,
            mod_metadata,
        }) = self.writers.take()
        else {
            return Err(EngineError::AlreadyStarted);
        };
        let config = self.config.clone();

        self.spawn(Poller::new(
            "players",
            CommandSource::new(runner.clone(), &config.players.command),
            config.players.interval,
            handlers::players(players),
        ));
        self.spawn(Poller::new(
            "admins",
            AdminSource::new(runner.clone(), &config.admins.command, self.reader()),
            config.admins.interval,
            handlers::admins(admins),
        ));
        self.spawn(Poller::new(
            "server_config",
            ConfigSource::new(runner, config.server_config.options.clone()),
            config.server_config.interval,
            handlers::server_config(
                server_config,
                ConfigDecoders::standard(),
                config.server_config.show_password,
            ),
        ));

        match &config.server_ip {
            ServerIpConfig::Static(host) => {
                server_ip.replace(Some(host.clone()));
            }
            ServerIpConfig::Detect { url, interval } => self.spawn(Poller::new(
                "server_ip",
                HttpSource::new(http.clone(), url),
                *interval,
                handlers::server_ip(server_ip),
            )),
        }

        if let Some(mods_config) = &config.mods {
            self.spawn(Poller::new(
                "mods",
                ModFilesSource::new(&mods_config.directory),
                mods_config.interval,
                handlers::mods(mods),
            ));
        }
        if let Some(portal) = &config.mod_metadata {
            self.spawn(Poller::new(
                "mod_metadata",
                ModMetadataSource::new(http, &portal.api_url, self.reader()),
                portal.interval,
                handlers::mod_metadata(mod_metadata),
            ));
        }

        tracing::info!("engine started pollers: {}", self.poller_names().join(", "));
        Ok(())
    }

    fn spawn<S: Source>(&mut self, poller: Poller<S>) {
        let name = poller.name().to_string();
        let handle = tokio::spawn(poller.run(self.cancel.clone()));
        self.tasks.push((name, handle));
    }

    pub fn poller_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Cancel every poller, wait for all of them, then close the connection.
    /// No facet is written after this returns.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for (name, handle) in self.tasks.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!("{name} poller task ended abnormally: {e}");
            }
        }
        if let Some(rcon) = self.rcon.take() {
            rcon.close().await;
        }
        tracing::info!("engine stopped");
    }
}
