//! Shared status snapshot.
//!
//! Built as a `(SnapshotReader, SnapshotWriters)` pair. Each facet has one
//! [`FacetWriter`], which is not `Clone`, so exactly one handler can own it.
//! Writes replace the whole facet value behind an `Arc`; readers clone that
//! `Arc` under a momentary read lock and never observe a partial update.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use factorio_status_core::{FacetName, Mod, ModMetadataMap, Player, ServerConfig, ServerIdentity};

/// One facet's current value plus write bookkeeping.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FacetValue<T> {
    pub value: T,
    /// Snapshot version assigned by the write that produced this value (0 = never written).
    pub version: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct FacetCell<T> {
    current: RwLock<Arc<FacetValue<T>>>,
}

impl<T> FacetCell<T> {
    fn load(&self) -> Arc<FacetValue<T>> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn store(&self, value: Arc<FacetValue<T>>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = value;
    }
}

#[derive(Debug, Default)]
struct Facets {
    identity: ServerIdentity,
    version: AtomicU64,
    players: FacetCell<Vec<Player>>,
    admins: FacetCell<Vec<Player>>,
    mods: FacetCell<Vec<Mod>>,
    server_config: FacetCell<ServerConfig>,
    server_ip: FacetCell<Option<String>>,
    mod_metadata: FacetCell<ModMetadataMap>,
}

/// Create an empty snapshot and the single set of writers for it.
pub fn new_snapshot(identity: ServerIdentity) -> (SnapshotReader, SnapshotWriters) {
    let facets = Arc::new(Facets {
        identity,
        ..Facets::default()
    });
    let writers = SnapshotWriters {
        players: FacetWriter::new(&facets, |f| &f.players),
        admins: FacetWriter::new(&facets, |f| &f.admins),
        mods: FacetWriter::new(&facets, |f| &f.mods),
        server_config: FacetWriter::new(&facets, |f| &f.server_config),
        server_ip: FacetWriter::new(&facets, |f| &f.server_ip),
        mod_metadata: FacetWriter::new(&facets, |f| &f.mod_metadata),
    };
    (SnapshotReader { facets }, writers)
}

// ─── Writers ─────────────────────────────────────────────────────

pub struct FacetWriter<T> {
    facets: Arc<Facets>,
    cell: fn(&Facets) -> &FacetCell<T>,
}

impl<T> FacetWriter<T> {
    fn new(facets: &Arc<Facets>, cell: fn(&Facets) -> &FacetCell<T>) -> Self {
        Self {
            facets: Arc::clone(facets),
            cell,
        }
    }

    /// Atomically replace the facet value. Returns the new snapshot version.
    pub fn replace(&self, value: T) -> u64 {
        let version = self.facets.version.fetch_add(1, Ordering::AcqRel) + 1;
        (self.cell)(&self.facets).store(Arc::new(FacetValue {
            value,
            version,
            updated_at: Some(Utc::now()),
        }));
        version
    }

    pub fn current(&self) -> Arc<FacetValue<T>> {
        (self.cell)(&self.facets).load()
    }
}

/// One writer per facet. Move each field into the handler that owns it.
pub struct SnapshotWriters {
    pub players: FacetWriter<Vec<Player>>,
    pub admins: FacetWriter<Vec<Player>>,
    pub mods: FacetWriter<Vec<Mod>>,
    pub server_config: FacetWriter<ServerConfig>,
    pub server_ip: FacetWriter<Option<String>>,
    pub mod_metadata: FacetWriter<ModMetadataMap>,
}

// ─── Reader ──────────────────────────────────────────────────────

/// Read-only view handed to handlers that need other facets and to the
/// presentation layer.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    facets: Arc<Facets>,
}

impl SnapshotReader {
    /// Highest version assigned to any facet write so far.
    pub fn version(&self) -> u64 {
        self.facets.version.load(Ordering::Acquire)
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.facets.identity
    }

    pub fn players(&self) -> Arc<FacetValue<Vec<Player>>> {
        self.facets.players.load()
    }

    pub fn admins(&self) -> Arc<FacetValue<Vec<Player>>> {
        self.facets.admins.load()
    }

    pub fn mods(&self) -> Arc<FacetValue<Vec<Mod>>> {
        self.facets.mods.load()
    }

    pub fn server_config(&self) -> Arc<FacetValue<ServerConfig>> {
        self.facets.server_config.load()
    }

    pub fn server_ip(&self) -> Arc<FacetValue<Option<String>>> {
        self.facets.server_ip.load()
    }

    pub fn mod_metadata(&self) -> Arc<FacetValue<ModMetadataMap>> {
        self.facets.mod_metadata.load()
    }

    /// JSON for a single facet.
    pub fn facet_json(&self, name: FacetName) -> serde_json::Value {
        let value = match name {
            FacetName::Players => serde_json::to_value(&*self.players()),
            FacetName::Admins => serde_json::to_value(&*self.admins()),
            FacetName::Mods => serde_json::to_value(&*self.mods()),
            FacetName::ServerConfig => serde_json::to_value(&*self.server_config()),
            FacetName::ServerIp => serde_json::to_value(&*self.server_ip()),
            FacetName::ModMetadata => serde_json::to_value(&*self.mod_metadata()),
        };
        value.unwrap_or_else(|e| {
            tracing::warn!("failed to serialize facet {name}: {e}");
            serde_json::Value::Null
        })
    }

    /// JSON for the whole snapshot: server identity plus every facet.
    pub fn snapshot_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert("version".to_string(), self.version().into());
        object.insert(
            "server".to_string(),
            serde_json::to_value(self.identity()).unwrap_or(serde_json::Value::Null),
        );
        for name in FacetName::ALL {
            object.insert(name.as_str().to_string(), self.facet_json(name));
        }
        serde_json::Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot() {
        let (reader, _writers) = new_snapshot(ServerIdentity::default());
        assert_eq!(reader.version(), 0);
        assert!(reader.players().value.is_empty());
        assert_eq!(reader.players().version, 0);
        assert!(reader.players().updated_at.is_none());
        assert_eq!(reader.server_ip().value, None);
    }

    #[test]
    fn replace_bumps_versions() {
        let (reader, writers) = new_snapshot(ServerIdentity::default());

        let v1 = writers.players.replace(vec![Player::online("alice")]);
        let v2 = writers.admins.replace(vec![Player::offline("carol")]);
        assert_eq!((v1, v2), (1, 2));
        assert_eq!(reader.version(), 2);
        assert_eq!(reader.players().version, 1);
        assert_eq!(reader.admins().version, 2);
        assert!(reader.players().updated_at.is_some());
    }

    #[test]
    fn readers_keep_their_value_across_replace() {
        let (reader, writers) = new_snapshot(ServerIdentity::default());
        writers.players.replace(vec![Player::online("alice")]);

        let held = reader.players();
        writers.players.replace(vec![Player::online("bob")]);

        assert_eq!(held.value, vec![Player::online("alice")]);
        assert_eq!(reader.players().value, vec![Player::online("bob")]);
    }

    #[test]
    fn writer_sees_its_own_value() {
        let (_reader, writers) = new_snapshot(ServerIdentity::default());
        writers.server_ip.replace(Some("203.0.113.7".to_string()));
        assert_eq!(
            writers.server_ip.current().value.as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn snapshot_json_contains_every_facet() {
        let (reader, writers) = new_snapshot(ServerIdentity {
            name: "Test".to_string(),
            port: 34197,
        });
        writers.players.replace(vec![Player::online("alice")]);

        let json = reader.snapshot_json();
        assert_eq!(json["version"], 1);
        assert_eq!(json["server"]["name"], "Test");
        assert_eq!(json["players"]["value"][0]["username"], "alice");
        assert_eq!(json["players"]["version"], 1);
        for name in FacetName::ALL {
            assert!(json.get(name.as_str()).is_some(), "missing facet {name}");
        }
        assert_eq!(json["server_ip"]["value"], serde_json::Value::Null);
    }

    #[test]
    fn concurrent_readers_see_whole_values() {
        let (reader, writers) = new_snapshot(ServerIdentity::default());
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reader = reader.clone();
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let players = reader.players();
                        // Every write stores `n` players all named after `n`.
                        let n = players.value.len();
                        assert!(players.value.iter().all(|p| p.username == n.to_string()));
                    }
                })
            })
            .collect();

        for n in 0..200usize {
            writers
                .players
                .replace((0..n).map(|_| Player::online(n.to_string())).collect());
        }
        stop.store(true, Ordering::Relaxed);
        for handle in readers {
            handle.join().expect("reader thread");
        }
    }
}
