//! Poller handlers: parse a changed value and replace one facet.
//!
//! Each constructor consumes the facet's only [`FacetWriter`], so every
//! facet has exactly one handler writing it.

use std::collections::BTreeMap;

use factorio_status_core::{
    ConfigDecoders, Mod, ModMetadataMap, ParseError, Player, ServerConfig, decode_server_config,
    merge_mod_metadata, parse_admins, parse_mod_metadata, parse_mods, parse_players,
    parse_public_ip,
};

use crate::snapshot::FacetWriter;
use crate::sources::{AdminInput, ModFiles};

pub fn players(
    writer: FacetWriter<Vec<Player>>,
) -> impl FnMut(&Vec<u8>) -> Result<(), ParseError> + Send + 'static {
    move |raw| {
        let players = parse_players(raw);
        let online = players.iter().filter(|p| p.is_online).count();
        tracing::info!("players updated: {online} online, {} known", players.len());
        writer.replace(players);
        Ok(())
    }
}

pub fn admins(
    writer: FacetWriter<Vec<Player>>,
) -> impl FnMut(&AdminInput) -> Result<(), ParseError> + Send + 'static {
    move |input| {
        let admins = parse_admins(&input.raw, &input.players);
        tracing::info!("admins updated: {} listed", admins.len());
        writer.replace(admins);
        Ok(())
    }
}

/// Options whose value failed to decode are stored raw and logged; the
/// rest of the mapping still replaces the facet.
pub fn server_config(
    writer: FacetWriter<ServerConfig>,
    decoders: ConfigDecoders,
    show_password: bool,
) -> impl FnMut(&BTreeMap<String, Vec<u8>>) -> Result<(), ParseError> + Send + 'static {
    move |raw| {
        let decoded = decode_server_config(&decoders, raw, show_password);
        for e in &decoded.errors {
            tracing::warn!("server config: {e}");
        }
        tracing::info!("server config updated: {} options", decoded.config.len());
        writer.replace(decoded.config);
        Ok(())
    }
}

pub fn mods(
    writer: FacetWriter<Vec<Mod>>,
) -> impl FnMut(&ModFiles) -> Result<(), ParseError> + Send + 'static {
    move |files| {
        let mods = parse_mods(&files.mod_list, &files.archives)?;
        let enabled = mods.iter().filter(|m| m.enabled).count();
        tracing::info!("mods updated: {enabled} enabled, {} installed", mods.len());
        writer.replace(mods);
        Ok(())
    }
}

pub fn server_ip(
    writer: FacetWriter<Option<String>>,
) -> impl FnMut(&Vec<u8>) -> Result<(), ParseError> + Send + 'static {
    move |raw| {
        let ip = parse_public_ip(raw)?;
        tracing::info!("public address updated: {ip}");
        writer.replace(Some(ip.to_string()));
        Ok(())
    }
}

/// Additive merge: portal entries for mods that disappear are kept.
pub fn mod_metadata(
    writer: FacetWriter<ModMetadataMap>,
) -> impl FnMut(&Option<Vec<u8>>) -> Result<(), ParseError> + Send + 'static {
    move |body| {
        let Some(body) = body else {
            return Ok(());
        };
        let fetched = parse_mod_metadata(body)?;
        let merged = merge_mod_metadata(&writer.current().value, fetched);
        tracing::info!("mod metadata updated: {} entries", merged.len());
        writer.replace(merged);
        Ok(())
    }
}
