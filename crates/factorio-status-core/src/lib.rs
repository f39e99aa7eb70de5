//! factorio-status-core: snapshot value types and the pure parsers that turn
//! raw console, file and portal data into them. No IO, no async.

pub mod address;
pub mod config;
pub mod error;
pub mod mods;
pub mod players;
pub mod types;

pub use address::parse_public_ip;
pub use config::{ConfigDecoders, DecodedConfig, decode_server_config};
pub use error::ParseError;
pub use mods::{merge_mod_metadata, parse_mod_metadata, parse_mods, portal_mod_names};
pub use players::{parse_admins, parse_players};
pub use types::{
    ConfigValue, FacetName, Mod, ModMetadata, ModMetadataMap, PasswordState, Player,
    ServerConfig, ServerIdentity,
};
