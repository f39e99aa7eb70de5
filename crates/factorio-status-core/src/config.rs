//! Per-option decoders for `/config get <option>` responses.
//!
//! Every tracked option has an explicit decoder. Options without one are
//! kept as text. Decoders match whole values only: a description that
//! happens to contain "enabled" stays text.

use std::collections::{BTreeMap, HashMap};

use crate::error::ParseError;
use crate::types::{ConfigValue, PasswordState, ServerConfig};

pub type Decoder = fn(&str) -> Result<ConfigValue, String>;

/// Options polled when none are configured explicitly.
pub const DEFAULT_OPTIONS: &[&str] = &[
    "name",
    "description",
    "max-players",
    "password",
    "visibility-public",
    "visibility-lan",
    "require-user-verification",
    "allow-commands",
    "autosave-interval",
    "autosave-slots",
    "afk-autokick",
    "only-admins-can-pause",
];

const NO_PASSWORD: &str = "no password";

/// Registry of option name → decoder.
#[derive(Debug, Clone)]
pub struct ConfigDecoders {
    decoders: HashMap<String, Decoder>,
}

impl ConfigDecoders {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Decoders for the options Factorio exposes through `/config`.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("name", decode_text);
        registry.register("description", decode_text);
        registry.register("allow-commands", decode_text);
        registry.register("max-players", decode_count);
        registry.register("autosave-slots", decode_count);
        registry.register("password", decode_password);
        registry.register("visibility-public", decode_flag);
        registry.register("visibility-lan", decode_flag);
        registry.register("require-user-verification", decode_flag);
        registry.register("only-admins-can-pause", decode_flag);
        registry.register("autosave-interval", decode_minutes);
        registry.register("afk-autokick", decode_minutes);
        registry
    }

    pub fn register(&mut self, option: impl Into<String>, decoder: Decoder) {
        self.decoders.insert(option.into(), decoder);
    }

    /// Decode one option. Unregistered options decode as text.
    pub fn decode(&self, option: &str, raw: &[u8]) -> Result<ConfigValue, ParseError> {
        let text = String::from_utf8_lossy(raw);
        let decoder = self.decoders.get(option).copied().unwrap_or(decode_text);
        decoder(text.trim()).map_err(|detail| ParseError::ConfigValue {
            option: option.to_string(),
            detail,
        })
    }
}

impl Default for ConfigDecoders {
    fn default() -> Self {
        Self::standard()
    }
}

/// Result of decoding a whole `/config` mapping.
#[derive(Debug, Default)]
pub struct DecodedConfig {
    pub config: ServerConfig,
    /// Options whose decoder rejected the value. They are stored as
    /// [`ConfigValue::Raw`] in `config`.
    pub errors: Vec<ParseError>,
}

/// Decode every option of a raw `/config get` mapping.
///
/// The password is redacted to [`PasswordState::Hidden`] unless
/// `show_password` is set.
pub fn decode_server_config(
    decoders: &ConfigDecoders,
    raw: &BTreeMap<String, Vec<u8>>,
    show_password: bool,
) -> DecodedConfig {
    let mut decoded = DecodedConfig::default();
    for (option, value) in raw {
        let value = match decoders.decode(option, value) {
            Ok(ConfigValue::Password(PasswordState::Visible(_))) if !show_password => {
                ConfigValue::Password(PasswordState::Hidden)
            }
            Ok(value) => value,
            Err(e) => {
                decoded.errors.push(e);
                ConfigValue::Raw(String::from_utf8_lossy(value).trim().to_string())
            }
        };
        decoded.config.insert(option.clone(), value);
    }
    decoded
}

// ─── Decoders ─────────────────────────────────────────────────────

pub fn decode_text(value: &str) -> Result<ConfigValue, String> {
    Ok(ConfigValue::Text(value.to_string()))
}

pub fn decode_flag(value: &str) -> Result<ConfigValue, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "enabled" | "yes" => Ok(ConfigValue::Flag(true)),
        "false" | "disabled" | "no" => Ok(ConfigValue::Flag(false)),
        _ => Err(format!("expected true/false, got {value:?}")),
    }
}

pub fn decode_count(value: &str) -> Result<ConfigValue, String> {
    value
        .parse::<u64>()
        .map(ConfigValue::Count)
        .map_err(|e| format!("expected a non-negative integer, got {value:?}: {e}"))
}

/// Accepts `every N minutes`, `N minutes`, `N`, and `disabled`/`0`.
pub fn decode_minutes(value: &str) -> Result<ConfigValue, String> {
    let lower = value.to_ascii_lowercase();
    if lower == "disabled" || lower == "never" {
        return Ok(ConfigValue::Minutes(None));
    }
    let rest = lower.strip_prefix("every ").unwrap_or(&lower);
    let number = rest
        .strip_suffix(" minutes")
        .or_else(|| rest.strip_suffix(" minute"))
        .unwrap_or(rest)
        .trim();
    let minutes = number
        .parse::<u32>()
        .map_err(|_| format!("expected a minute interval, got {value:?}"))?;
    Ok(ConfigValue::Minutes((minutes > 0).then_some(minutes)))
}

pub fn decode_password(value: &str) -> Result<ConfigValue, String> {
    if value.is_empty() || value.eq_ignore_ascii_case(NO_PASSWORD) {
        Ok(ConfigValue::Password(PasswordState::Unset))
    } else {
        Ok(ConfigValue::Password(PasswordState::Visible(value.to_string())))
    }
}
