//! Error types for the RCON client.

use std::time::Duration;

use thiserror::Error;

use crate::connection::ConnectionState;

#[derive(Debug, Error)]
pub enum RconError {
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("connection to {addr} refused")]
    ConnectionRefused { addr: String },

    #[error("rcon authentication failed")]
    AuthenticationFailed,

    #[error("rcon command {command:?} timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("malformed rcon frame: {0}")]
    MalformedFrame(String),

    #[error("rcon connection not ready (state: {0:?})")]
    NotReady(ConnectionState),

    #[error("rcon connection closed by peer")]
    Closed,

    #[error("rcon io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RconError {
    /// True for failures after which the transport's framing position is unknown.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Self::CommandTimeout { .. } | Self::MalformedFrame(_) | Self::Closed | Self::Io(_)
        )
    }
}
