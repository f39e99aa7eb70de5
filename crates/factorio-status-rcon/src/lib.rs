//! factorio-status-rcon: RCON client IO boundary.
//! Frame codec, a single authenticated connection, and the shared handle
//! that serializes commands from every poller. No status logic.

pub mod connection;
pub mod error;
pub mod frame;
pub mod runner;
pub mod shared;

pub use connection::{ConnectionState, RconConfig, RconConnection};
pub use error::RconError;
pub use frame::{Frame, PacketType};
pub use runner::CommandRunner;
pub use shared::SharedRcon;
