//! Poller sources: console commands, mod files on disk, and HTTP endpoints.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use factorio_status_core::{Player, portal_mod_names};
use factorio_status_rcon::CommandRunner;

use crate::error::SourceError;
use crate::poller::Source;
use crate::snapshot::SnapshotReader;

// ─── Console ─────────────────────────────────────────────────────

/// Raw payload of one console command.
pub struct CommandSource<R> {
    runner: R,
    command: String,
}

impl<R: CommandRunner + 'static> CommandSource<R> {
    pub fn new(runner: R, command: impl Into<String>) -> Self {
        Self {
            runner,
            command: command.into(),
        }
    }
}

impl<R: CommandRunner + 'static> Source for CommandSource<R> {
    type Value = Vec<u8>;

    async fn produce(&mut self) -> Result<Vec<u8>, SourceError> {
        Ok(self.runner.run_command(&self.command).await?)
    }
}

/// Admin list payload paired with the players facet it will be joined with.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminInput {
    pub raw: Vec<u8>,
    pub players: Vec<Player>,
}

/// `/admins` plus the current players facet. A change in either re-runs the
/// join, so admin online flags follow player logins.
pub struct AdminSource<R> {
    command: CommandSource<R>,
    snapshot: SnapshotReader,
}

impl<R: CommandRunner + 'static> AdminSource<R> {
    pub fn new(runner: R, command: impl Into<String>, snapshot: SnapshotReader) -> Self {
        Self {
            command: CommandSource::new(runner, command),
            snapshot,
        }
    }
}

impl<R: CommandRunner + 'static> Source for AdminSource<R> {
    type Value = AdminInput;

    async fn produce(&mut self) -> Result<AdminInput, SourceError> {
        let raw = self.command.produce().await?;
        let players = self.snapshot.players().value.clone();
        Ok(AdminInput { raw, players })
    }
}

/// One `/config get <option>` per option, collected into a single mapping.
///
/// Any failing query fails the whole cycle: a partial mapping would look
/// like a change on the next complete one.
pub struct ConfigSource<R> {
    runner: R,
    options: Vec<String>,
}

impl<R: CommandRunner + 'static> ConfigSource<R> {
    pub fn new(runner: R, options: Vec<String>) -> Self {
        Self { runner, options }
    }
}

impl<R: CommandRunner + 'static> Source for ConfigSource<R> {
    type Value = BTreeMap<String, Vec<u8>>;

    async fn produce(&mut self) -> Result<Self::Value, SourceError> {
        let mut values = BTreeMap::new();
        for option in &self.options {
            let raw = self
                .runner
                .run_command(&format!("/config get {option}"))
                .await?;
            values.insert(option.clone(), raw);
        }
        Ok(values)
    }
}

// ─── Mods directory ──────────────────────────────────────────────

pub const MOD_LIST_FILE: &str = "mod-list.json";

/// Contents of `mod-list.json` plus the sorted archive file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModFiles {
    pub mod_list: Vec<u8>,
    pub archives: Vec<String>,
}

pub struct ModFilesSource {
    directory: PathBuf,
}

impl ModFilesSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    async fn list_archives(&self) -> Result<Vec<String>, SourceError> {
        let io_err = |source: std::io::Error| SourceError::File {
            path: self.directory.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.directory).await.map_err(io_err)?;
        let mut archives = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if Path::new(&name).extension().is_some_and(|ext| ext == "zip") {
                archives.push(name);
            }
        }
        archives.sort();
        Ok(archives)
    }
}

impl Source for ModFilesSource {
    type Value = ModFiles;

    async fn produce(&mut self) -> Result<ModFiles, SourceError> {
        let path = self.directory.join(MOD_LIST_FILE);
        let mod_list = tokio::fs::read(&path)
            .await
            .map_err(|source| SourceError::File { path, source })?;
        let archives = self.list_archives().await?;
        Ok(ModFiles { mod_list, archives })
    }
}

// ─── HTTP ────────────────────────────────────────────────────────

async fn fetch(request: reqwest::RequestBuilder) -> Result<Vec<u8>, SourceError> {
    let response = request.send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Body of a plain GET, e.g. a public-IP echo service.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Source for HttpSource {
    type Value = Vec<u8>;

    async fn produce(&mut self) -> Result<Vec<u8>, SourceError> {
        fetch(self.client.get(&self.url)).await
    }
}

/// Mod portal lookup for every non-builtin mod in the mods facet.
///
/// Produces `None` while no such mods are known, so nothing is fetched
/// before the mods poller has reported.
pub struct ModMetadataSource {
    client: reqwest::Client,
    api_url: String,
    snapshot: SnapshotReader,
}

impl ModMetadataSource {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        snapshot: SnapshotReader,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            snapshot,
        }
    }
}

impl Source for ModMetadataSource {
    type Value = Option<Vec<u8>>;

    async fn produce(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let names = portal_mod_names(&self.snapshot.mods().value);
        if names.is_empty() {
            return Ok(None);
        }
        let request = self.client.get(&self.api_url).query(&[
            ("namelist", names.join(",")),
            ("page_size", "max".to_string()),
        ]);
        Ok(Some(fetch(request).await?))
    }
}
