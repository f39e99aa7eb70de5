use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// ─── Facets ───────────────────────────────────────────────────────

/// Named slice of the status snapshot. Each facet has exactly one writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetName {
    Players,
    Admins,
    Mods,
    ServerConfig,
    ServerIp,
    ModMetadata,
}

impl FacetName {
    pub const ALL: [Self; 6] = [
        Self::Players,
        Self::Admins,
        Self::Mods,
        Self::ServerConfig,
        Self::ServerIp,
        Self::ModMetadata,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Players => "players",
            Self::Admins => "admins",
            Self::Mods => "mods",
            Self::ServerConfig => "server_config",
            Self::ServerIp => "server_ip",
            Self::ModMetadata => "mod_metadata",
        }
    }
}

impl fmt::Display for FacetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacetName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|facet| facet.as_str() == s)
            .ok_or_else(|| ParseError::UnknownFacet(s.to_string()))
    }
}

// ─── Players ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    pub is_online: bool,
}

impl Player {
    pub fn online(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_online: true,
        }
    }

    pub fn offline(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_online: false,
        }
    }
}

// ─── Mods ─────────────────────────────────────────────────────────

/// One entry of `mod-list.json`, joined with the archive found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mod {
    pub name: String,
    pub enabled: bool,
    /// Version taken from the `<name>_<version>.zip` archive, if one exists.
    /// Built-in mods (`base`) ship without an archive.
    pub version: Option<String>,
    pub archive: Option<String>,
}

/// Mod portal metadata for a single mod. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModMetadata {
    pub name: String,
    pub title: Option<String>,
    pub owner: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub downloads_count: Option<u64>,
    pub thumbnail: Option<String>,
}

pub type ModMetadataMap = BTreeMap<String, ModMetadata>;

// ─── Server config ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum PasswordState {
    /// The server accepts players without a password.
    Unset,
    /// A password is set but hidden from viewers.
    Hidden,
    Visible(String),
}

/// A decoded `/config get <option>` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    Text(String),
    Flag(bool),
    Count(u64),
    /// `None` when the interval is disabled.
    Minutes(Option<u32>),
    Password(PasswordState),
    /// Kept verbatim because the option decoder rejected it.
    Raw(String),
}

pub type ServerConfig = BTreeMap<String, ConfigValue>;

// ─── Server identity ──────────────────────────────────────────────

/// Display-only server identity. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub name: String,
    pub port: u16,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self {
            name: "Factorio Server".to_string(),
            port: 34197,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facet_name_display_and_parse() {
        for facet in FacetName::ALL {
            let parsed: FacetName = facet.to_string().parse().expect("parse");
            assert_eq!(facet, parsed);
        }
    }

    #[test]
    fn facet_name_unknown_is_error() {
        let err = "weather".parse::<FacetName>().expect_err("unknown facet");
        assert!(matches!(err, ParseError::UnknownFacet(ref name) if name == "weather"));
    }

    #[test]
    fn config_value_serializes_tagged() {
        let json = serde_json::to_value(ConfigValue::Minutes(Some(10))).expect("serialize");
        assert_eq!(json, serde_json::json!({"kind": "minutes", "value": 10}));

        let json = serde_json::to_value(ConfigValue::Password(PasswordState::Hidden))
            .expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"kind": "password", "value": {"state": "hidden"}})
        );
    }

    #[test]
    fn mod_metadata_ignores_unknown_fields() {
        let meta: ModMetadata = serde_json::from_value(serde_json::json!({
            "name": "Krastorio2",
            "title": "Krastorio 2",
            "score": 1234.5,
            "latest_release": {"version": "1.3.24"}
        }))
        .expect("deserialize");
        assert_eq!(meta.name, "Krastorio2");
        assert_eq!(meta.title.as_deref(), Some("Krastorio 2"));
        assert_eq!(meta.downloads_count, None);
    }
}
