//! Mod list, archive listing and mod portal parsers.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::error::ParseError;
use crate::types::{Mod, ModMetadata, ModMetadataMap};

/// Mods shipped with the game; they never appear on the mod portal.
pub const BUILTIN_MODS: &[&str] = &["base", "elevated-rails", "quality", "space-age"];

#[derive(Debug, Deserialize)]
struct ModList {
    mods: Vec<ModListEntry>,
}

#[derive(Debug, Deserialize)]
struct ModListEntry {
    name: String,
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct PortalResponse {
    #[serde(default)]
    results: Vec<ModMetadata>,
}

/// Join `mod-list.json` with the archive file names found in the mods directory.
///
/// Archives are named `<name>_<version>.zip`. When several versions of the
/// same mod are on disk the highest version wins.
pub fn parse_mods(mod_list: &[u8], archives: &[String]) -> Result<Vec<Mod>, ParseError> {
    let list: ModList = serde_json::from_slice(mod_list).map_err(|source| ParseError::Json {
        what: "mod-list.json",
        source,
    })?;

    let parsed_archives: Vec<(&str, &str, &String)> = archives
        .iter()
        .filter_map(|archive| {
            let (name, version) = split_archive_name(archive)?;
            Some((name, version, archive))
        })
        .collect();

    Ok(list
        .mods
        .into_iter()
        .map(|entry| {
            let best = parsed_archives
                .iter()
                .filter(|(name, _, _)| *name == entry.name)
                .max_by(|a, b| compare_versions(a.1, b.1));
            Mod {
                version: best.map(|(_, version, _)| (*version).to_string()),
                archive: best.map(|(_, _, archive)| (*archive).clone()),
                name: entry.name,
                enabled: entry.enabled,
            }
        })
        .collect())
}

/// Split `Krastorio2_1.3.24.zip` into `("Krastorio2", "1.3.24")`.
fn split_archive_name(archive: &str) -> Option<(&str, &str)> {
    let stem = archive.strip_suffix(".zip")?;
    let (name, version) = stem.rsplit_once('_')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name, version))
}

/// Compare dotted versions numerically, falling back to text for
/// non-numeric components.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Names worth looking up on the mod portal.
pub fn portal_mod_names(mods: &[Mod]) -> Vec<String> {
    mods.iter()
        .filter(|m| !BUILTIN_MODS.contains(&m.name.as_str()))
        .map(|m| m.name.clone())
        .collect()
}

/// Parse a mod portal `api/mods` response body.
pub fn parse_mod_metadata(body: &[u8]) -> Result<Vec<ModMetadata>, ParseError> {
    let response: PortalResponse =
        serde_json::from_slice(body).map_err(|source| ParseError::Json {
            what: "mod portal response",
            source,
        })?;
    Ok(response
        .results
        .into_iter()
        .filter(|meta| !meta.name.is_empty())
        .collect())
}

/// Merge fetched metadata into `existing`, keyed by mod name.
///
/// Entries missing from `fetched` are kept: the portal may page its results.
pub fn merge_mod_metadata(existing: &ModMetadataMap, fetched: Vec<ModMetadata>) -> ModMetadataMap {
    let mut merged = existing.clone();
    for meta in fetched {
        merged.insert(meta.name.clone(), meta);
    }
    merged
}
