//! SharedRcon: one connection shared by every console poller.
//!
//! The protocol allows a single outstanding exchange per connection, so all
//! commands queue on a FIFO async mutex. A connection that failed mid-run is
//! replaced by a fresh one on the next command; a rejected password is never
//! retried.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::connection::{ConnectionState, RconConfig, RconConnection};
use crate::error::RconError;
use crate::runner::CommandRunner;

#[derive(Clone)]
pub struct SharedRcon {
    config: Arc<RconConfig>,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    conn: RconConnection<TcpStream>,
    /// A reconnect was rejected by the server; the credential is wrong.
    auth_rejected: bool,
    /// [`SharedRcon::close`] was called; no further connections are opened.
    closed: bool,
    reconnects: u64,
}

impl SharedRcon {
    /// Open and authenticate the initial connection. Failure here is final.
    pub async fn open(config: RconConfig) -> Result<Self, RconError> {
        let conn = RconConnection::connect(config.clone()).await?;
        Ok(Self {
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(Inner {
                conn,
                auth_rejected: false,
                closed: false,
                reconnects: 0,
            })),
        })
    }

    pub fn config(&self) -> &RconConfig {
        &self.config
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.conn.state()
    }

    /// Number of times a failed connection has been replaced.
    pub async fn reconnects(&self) -> u64 {
        self.inner.lock().await.reconnects
    }

    /// Run `command` once every earlier queued command has finished.
    pub async fn run_command(&self, command: &str) -> Result<Vec<u8>, RconError> {
        let mut inner = self.inner.lock().await;

        if inner.closed {
            return Err(RconError::NotReady(ConnectionState::Closed));
        }
        if inner.auth_rejected {
            return Err(RconError::AuthenticationFailed);
        }
        if !inner.conn.is_ready() {
            self.reconnect(&mut inner).await?;
        }

        inner.conn.run_command(command).await
    }

    async fn reconnect(&self, inner: &mut Inner) -> Result<(), RconError> {
        tracing::info!(
            "rcon connection {:?}, reconnecting to {}",
            inner.conn.state(),
            self.config.addr()
        );
        inner.conn.close().await;

        let mut fresh = RconConnection::<TcpStream>::new((*self.config).clone());
        let result = fresh.open().await;
        inner.conn = fresh;
        match result {
            Ok(()) => {
                inner.reconnects += 1;
                Ok(())
            }
            Err(RconError::AuthenticationFailed) => {
                tracing::error!("rcon password rejected on reconnect, giving up");
                inner.auth_rejected = true;
                Err(RconError::AuthenticationFailed)
            }
            Err(e) => Err(e),
        }
    }

    /// Close the connection. Waits for an in-flight exchange (bounded by the
    /// timeout) and is safe to call more than once.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        inner.conn.close().await;
    }
}

impl CommandRunner for SharedRcon {
    async fn run_command(&self, command: &str) -> Result<Vec<u8>, RconError> {
        SharedRcon::run_command(self, command).await
    }
}
