//! Error types for the polling engine.

use std::path::PathBuf;

use factorio_status_core::ParseError;
use factorio_status_rcon::RconError;

/// Failure while producing a poller value.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Rcon(#[from] RconError),

    #[error("cannot read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One failed poll cycle. Logged by the poller loop, never propagated past it.
#[derive(Debug, thiserror::Error)]
pub enum PollerCycleError {
    #[error("{poller} poller: producing value failed: {source}")]
    Produce {
        poller: String,
        #[source]
        source: SourceError,
    },

    #[error("{poller} poller: handling value failed: {source}")]
    Handle {
        poller: String,
        #[source]
        source: ParseError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine already started")]
    AlreadyStarted,

    #[error("rcon connection failed: {0}")]
    Rcon(#[from] RconError),

    #[error("cannot build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
