//! Error types for the parsers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON in {what}: {source}")]
    Json {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid public IP address: {0:?}")]
    InvalidAddress(String),

    #[error("unknown facet: {0}")]
    UnknownFacet(String),

    #[error("cannot decode config option {option}: {detail}")]
    ConfigValue { option: String, detail: String },
}
