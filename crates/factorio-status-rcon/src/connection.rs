//! A single authenticated RCON connection.
//!
//! Lifecycle:
//! 1. `Disconnected` → `Connecting`: transport established within the timeout
//! 2. `Authenticating`: Auth frame sent, verdict read
//! 3. `Ready`: sequential command/response exchanges
//! 4. `Closed` after [`RconConnection::close`], or `Failed` after any error
//!    that leaves the framing position unknown
//!
//! A connection is never reopened; callers build a fresh one instead.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::RconError;
use crate::frame::{self, AUTH_FAILED_ID, Frame, PacketType, SIZE_FIELD_LEN};

/// Default I/O timeout, matching the game server's own RCON latency.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands that are answered by a response frame plus an empty trailer.
pub const DEFAULT_MULTI_PACKET_PREFIXES: &[&str] = &["/config"];

const AUTH_LABEL: &str = "<auth>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Closed,
    Failed,
}

#[derive(Clone)]
pub struct RconConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Bounds the connect and every individual frame read/write.
    pub timeout: Duration,
    pub multi_packet_prefixes: Vec<String>,
}

impl RconConfig {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
            multi_packet_prefixes: DEFAULT_MULTI_PACKET_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_multi_packet_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.multi_packet_prefixes = prefixes;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether `command` is answered by a response plus a trailer frame.
    pub fn is_multi_packet(&self, command: &str) -> bool {
        self.multi_packet_prefixes
            .iter()
            .any(|prefix| command.starts_with(prefix.as_str()))
    }
}

impl fmt::Debug for RconConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("multi_packet_prefixes", &self.multi_packet_prefixes)
            .finish()
    }
}

pub struct RconConnection<S = TcpStream> {
    config: RconConfig,
    stream: Option<S>,
    state: ConnectionState,
    next_id: i32,
    /// Set while an exchange is on the wire. Still set on entry means the
    /// previous exchange's future was dropped half-way.
    in_flight: bool,
}

impl<S> RconConnection<S> {
    pub fn new(config: RconConfig) -> Self {
        Self {
            config,
            stream: None,
            state: ConnectionState::Disconnected,
            next_id: 1,
            in_flight: false,
        }
    }

    /// Wrap an already established transport; call [`Self::authenticate`] next.
    pub fn from_stream(config: RconConfig, stream: S) -> Self {
        Self {
            stream: Some(stream),
            state: ConnectionState::Authenticating,
            ..Self::new(config)
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn config(&self) -> &RconConfig {
        &self.config
    }

    fn alloc_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = if id == i32::MAX { 1 } else { id + 1 };
        id
    }

    /// Drop the transport without a graceful shutdown.
    fn fail(&mut self) {
        self.stream = None;
        self.in_flight = false;
        self.state = ConnectionState::Failed;
    }
}

impl RconConnection<TcpStream> {
    /// Connect over TCP and authenticate.
    pub async fn connect(config: RconConfig) -> Result<Self, RconError> {
        let mut conn = Self::new(config);
        conn.open().await?;
        Ok(conn)
    }

    pub async fn open(&mut self) -> Result<(), RconError> {
        let host = self.config.host.clone();
        let port = self.config.port;
        self.open_with(async move { TcpStream::connect((host.as_str(), port)).await })
            .await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> RconConnection<S> {
    /// Establish the transport with `connect` (bounded by the timeout), then
    /// authenticate.
    pub async fn open_with<F>(&mut self, connect: F) -> Result<(), RconError>
    where
        F: Future<Output = io::Result<S>>,
    {
        if self.state != ConnectionState::Disconnected {
            return Err(RconError::NotReady(self.state));
        }
        self.state = ConnectionState::Connecting;

        let addr = self.config.addr();
        let timeout = self.config.timeout;
        let stream = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.fail();
                return Err(if e.kind() == io::ErrorKind::ConnectionRefused {
                    RconError::ConnectionRefused { addr }
                } else {
                    RconError::Io(e)
                });
            }
            Err(_) => {
                self.fail();
                return Err(RconError::ConnectTimeout { addr, timeout });
            }
        };

        tracing::debug!("rcon transport established to {addr}");
        self.stream = Some(stream);
        self.state = ConnectionState::Authenticating;
        self.authenticate().await
    }

    /// Send the credential and read the verdict.
    pub async fn authenticate(&mut self) -> Result<(), RconError> {
        if self.state != ConnectionState::Authenticating {
            return Err(RconError::NotReady(self.state));
        }

        match self.auth_exchange().await {
            Ok(()) => {
                self.state = ConnectionState::Ready;
                tracing::info!("rcon authenticated to {}", self.config.addr());
                Ok(())
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }

    async fn auth_exchange(&mut self) -> Result<(), RconError> {
        let id = self.alloc_id();
        let password = self.config.password.clone();
        self.write_frame(id, PacketType::AUTH, password.as_bytes(), AUTH_LABEL)
            .await?;

        let mut verdict = self.read_frame(AUTH_LABEL).await?;
        // Source-engine servers precede the verdict with one empty response.
        if verdict.packet_type == PacketType::RESPONSE_VALUE
            && verdict.body.is_empty()
            && verdict.request_id != AUTH_FAILED_ID
        {
            tracing::trace!("skipping empty response before auth verdict");
            verdict = self.read_frame(AUTH_LABEL).await?;
        }

        if verdict.request_id == AUTH_FAILED_ID {
            return Err(RconError::AuthenticationFailed);
        }
        Ok(())
    }

    /// Execute `command` and return its trimmed payload.
    ///
    /// Multi-packet commands have their trailer frame consumed before this
    /// returns, so the next exchange starts on a frame boundary.
    pub async fn run_command(&mut self, command: &str) -> Result<Vec<u8>, RconError> {
        if self.in_flight {
            tracing::warn!("previous rcon exchange was interrupted, discarding connection");
            self.fail();
        }
        if self.state != ConnectionState::Ready {
            return Err(RconError::NotReady(self.state));
        }

        self.in_flight = true;
        let result = self.exchange(command).await;
        self.in_flight = false;

        if let Err(ref e) = result
            && e.is_fatal_to_connection()
        {
            tracing::debug!("rcon connection failed during {command:?}: {e}");
            self.fail();
        }
        result
    }

    async fn exchange(&mut self, command: &str) -> Result<Vec<u8>, RconError> {
        let id = self.alloc_id();
        self.write_frame(id, PacketType::EXEC_COMMAND, command.as_bytes(), command)
            .await?;

        let response = self.read_frame(command).await?;
        if response.request_id != id {
            tracing::debug!(
                "rcon response id {} does not echo request id {id}",
                response.request_id
            );
        }

        if self.config.is_multi_packet(command) {
            let trailer = self.read_frame(command).await?;
            tracing::trace!(
                "discarded {} byte trailer frame for {command:?}",
                trailer.body.len()
            );
        }

        Ok(frame::trim_payload(&response.body).to_vec())
    }

    async fn write_frame(
        &mut self,
        id: i32,
        packet_type: PacketType,
        body: &[u8],
        label: &str,
    ) -> Result<(), RconError> {
        let bytes = frame::encode(id, packet_type, body)?;
        let timeout = self.config.timeout;
        let stream = self.stream.as_mut().ok_or(RconError::Closed)?;

        let write = async {
            stream.write_all(&bytes).await?;
            stream.flush().await
        };
        match tokio::time::timeout(timeout, write).await {
            Ok(result) => result.map_err(RconError::from),
            Err(_) => Err(RconError::CommandTimeout {
                command: label.to_string(),
                timeout,
            }),
        }
    }

    async fn read_frame(&mut self, label: &str) -> Result<Frame, RconError> {
        let timeout = self.config.timeout;
        let stream = self.stream.as_mut().ok_or(RconError::Closed)?;

        let read = async {
            let mut header = [0u8; SIZE_FIELD_LEN];
            stream.read_exact(&mut header).await.map_err(eof_as_closed)?;
            let size = frame::declared_size(header)?;

            let mut buf = vec![0u8; SIZE_FIELD_LEN + size];
            buf[..SIZE_FIELD_LEN].copy_from_slice(&header);
            stream
                .read_exact(&mut buf[SIZE_FIELD_LEN..])
                .await
                .map_err(eof_as_closed)?;
            frame::decode(&buf)
        };
        match tokio::time::timeout(timeout, read).await {
            Ok(result) => result,
            Err(_) => Err(RconError::CommandTimeout {
                command: label.to_string(),
                timeout,
            }),
        }
    }

    /// Release the transport. Safe in every state and idempotent.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = tokio::time::timeout(self.config.timeout, stream.shutdown()).await;
            tracing::debug!("rcon connection to {} closed", self.config.addr());
        }
        self.in_flight = false;
        self.state = ConnectionState::Closed;
    }
}

fn eof_as_closed(e: io::Error) -> RconError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        RconError::Closed
    } else {
        RconError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{DuplexStream, duplex};

    fn test_config() -> RconConfig {
        RconConfig::new("127.0.0.1", 27015, "secret").with_timeout(Duration::from_millis(200))
    }

    async fn read_request(server: &mut DuplexStream) -> Frame {
        let mut header = [0u8; 4];
        server.read_exact(&mut header).await.expect("request header");
        let size = frame::declared_size(header).expect("request size");
        let mut buf = vec![0u8; 4 + size];
        buf[..4].copy_from_slice(&header);
        server.read_exact(&mut buf[4..]).await.expect("request body");
        frame::decode(&buf).expect("decode request")
    }

    async fn respond(server: &mut DuplexStream, id: i32, packet_type: PacketType, body: &[u8]) {
        let bytes = frame::encode(id, packet_type, body).expect("encode response");
        server.write_all(&bytes).await.expect("write response");
    }

    /// Connection in `Ready` plus the server half of the transport.
    async fn ready_connection() -> (RconConnection<DuplexStream>, DuplexStream) {
        let (client, mut server) = duplex(64 * 1024);
        let mut conn = RconConnection::from_stream(test_config(), client);
        let auth = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            respond(&mut server, req.request_id, PacketType::AUTH_RESPONSE, b"").await;
            server
        });
        conn.authenticate().await.expect("auth");
        let server = auth.await.expect("server task");
        (conn, server)
    }

    #[tokio::test]
    async fn authenticate_success_becomes_ready() {
        let (client, mut server) = duplex(4096);
        let mut conn = RconConnection::from_stream(test_config(), client);
        let server_task = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            assert_eq!(req.packet_type, PacketType::AUTH);
            assert_eq!(&req.body[..], b"secret");
            respond(&mut server, req.request_id, PacketType::AUTH_RESPONSE, b"").await;
            server
        });

        conn.authenticate().await.expect("auth should succeed");
        assert_eq!(conn.state(), ConnectionState::Ready);
        let _server = server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn authenticate_failure_sentinel() {
        let (client, mut server) = duplex(4096);
        let mut conn = RconConnection::from_stream(test_config(), client);
        let server_task = tokio::spawn(async move {
            let _req = read_request(&mut server).await;
            respond(&mut server, AUTH_FAILED_ID, PacketType::AUTH_RESPONSE, b"").await;
            server
        });

        let err = conn.authenticate().await.expect_err("auth must fail");
        assert!(matches!(err, RconError::AuthenticationFailed));
        assert_eq!(conn.state(), ConnectionState::Failed);

        let err = conn.run_command("/players").await.expect_err("not ready");
        assert!(matches!(err, RconError::NotReady(ConnectionState::Failed)));
        let _server = server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn authenticate_skips_leading_empty_response() {
        let (client, mut server) = duplex(4096);
        let mut conn = RconConnection::from_stream(test_config(), client);
        let server_task = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            respond(&mut server, req.request_id, PacketType::RESPONSE_VALUE, b"").await;
            respond(&mut server, req.request_id, PacketType::AUTH_RESPONSE, b"").await;
            server
        });

        conn.authenticate().await.expect("auth should succeed");
        assert!(conn.is_ready());
        let _server = server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn command_response_is_trimmed() {
        let (mut conn, mut server) = ready_connection().await;
        let server_task = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            assert_eq!(req.packet_type, PacketType::EXEC_COMMAND);
            assert_eq!(&req.body[..], b"/players");
            respond(
                &mut server,
                req.request_id,
                PacketType::RESPONSE_VALUE,
                b"Players (1):\n  alice (online)\n\0",
            )
            .await;
            server
        });

        let body = conn.run_command("/players").await.expect("command");
        assert_eq!(body, b"Players (1):\n  alice (online)".to_vec());
        let _server = server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn config_command_consumes_trailer() {
        let (mut conn, mut server) = ready_connection().await;
        let server_task = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            respond(&mut server, req.request_id, PacketType::RESPONSE_VALUE, b"hunter2").await;
            respond(&mut server, req.request_id, PacketType::RESPONSE_VALUE, b"").await;

            let req = read_request(&mut server).await;
            assert_eq!(&req.body[..], b"/admins");
            respond(&mut server, req.request_id, PacketType::RESPONSE_VALUE, b"alice\n").await;
            server
        });

        let password = conn
            .run_command("/config get password")
            .await
            .expect("config");
        assert_eq!(password, b"hunter2".to_vec());

        let admins = conn.run_command("/admins").await.expect("admins");
        assert_eq!(admins, b"alice".to_vec());
        let _server = server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn plain_command_consumes_exactly_one_frame() {
        let (mut conn, mut server) = ready_connection().await;
        let server_task = tokio::spawn(async move {
            let req = read_request(&mut server).await;
            respond(&mut server, req.request_id, PacketType::RESPONSE_VALUE, b"first").await;
            respond(&mut server, req.request_id, PacketType::RESPONSE_VALUE, b"second").await;
            let _req = read_request(&mut server).await;
            server
        });

        assert_eq!(conn.run_command("/players").await.expect("one"), b"first".to_vec());
        // The extra frame is still queued and becomes the next response.
        assert_eq!(conn.run_command("/admins").await.expect("two"), b"second".to_vec());
        let _server = server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn command_timeout_fails_connection() {
        let (mut conn, mut server) = ready_connection().await;
        let server_task = tokio::spawn(async move {
            let _req = read_request(&mut server).await;
            server
        });

        let err = conn.run_command("/players").await.expect_err("timeout");
        assert!(
            matches!(err, RconError::CommandTimeout { ref command, .. } if command == "/players")
        );
        assert_eq!(conn.state(), ConnectionState::Failed);

        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Closed);
        let _server = server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn interrupted_exchange_discards_connection() {
        let (mut conn, mut server) = ready_connection().await;
        let server_task = tokio::spawn(async move {
            let _req = read_request(&mut server).await;
            server
        });

        let dropped =
            tokio::time::timeout(Duration::from_millis(20), conn.run_command("/players")).await;
        assert!(dropped.is_err(), "outer timeout should drop the exchange");

        let err = conn.run_command("/admins").await.expect_err("stale connection");
        assert!(matches!(err, RconError::NotReady(ConnectionState::Failed)));
        let _server = server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn peer_close_is_reported() {
        let (mut conn, mut server) = ready_connection().await;
        let server_task = tokio::spawn(async move {
            let _req = read_request(&mut server).await;
            drop(server);
        });

        let err = conn.run_command("/players").await.expect_err("closed");
        assert!(matches!(err, RconError::Closed));
        assert_eq!(conn.state(), ConnectionState::Failed);
        server_task.await.expect("server task");
    }

    #[tokio::test]
    async fn connect_timeout_leaves_close_safe() {
        let mut conn: RconConnection<DuplexStream> =
            RconConnection::new(test_config().with_timeout(Duration::from_millis(50)));

        let err = conn
            .open_with(std::future::pending::<io::Result<DuplexStream>>())
            .await
            .expect_err("connect must time out");
        assert!(matches!(err, RconError::ConnectTimeout { .. }));
        assert_eq!(conn.state(), ConnectionState::Failed);

        conn.close().await;
        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn connect_refused_is_classified() {
        let mut conn: RconConnection<DuplexStream> = RconConnection::new(test_config());
        let err = conn
            .open_with(async { Err(io::Error::from(io::ErrorKind::ConnectionRefused)) })
            .await
            .expect_err("refused");
        assert!(
            matches!(err, RconError::ConnectionRefused { ref addr } if addr == "127.0.0.1:27015")
        );
    }

    #[tokio::test]
    async fn open_twice_is_rejected() {
        let (mut conn, _server) = ready_connection().await;
        let err = conn
            .open_with(std::future::pending::<io::Result<DuplexStream>>())
            .await
            .expect_err("already open");
        assert!(matches!(err, RconError::NotReady(ConnectionState::Ready)));
    }

    #[test]
    fn request_ids_wrap_to_one() {
        let mut conn: RconConnection<DuplexStream> = RconConnection::new(test_config());
        conn.next_id = i32::MAX;
        assert_eq!(conn.alloc_id(), i32::MAX);
        assert_eq!(conn.alloc_id(), 1);
    }

    #[test]
    fn multi_packet_prefix_matching() {
        let config = test_config();
        assert!(config.is_multi_packet("/config get password"));
        assert!(!config.is_multi_packet("/players"));
        assert!(!config.is_multi_packet("config"));
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
