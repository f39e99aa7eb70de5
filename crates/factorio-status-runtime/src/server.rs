//! UDS JSON-RPC server: read-only access to the snapshot.
//! Connection-per-request, newline-delimited JSON.
//!
//! Methods:
//! - `snapshot`: every facet plus server identity and version.
//! - `facet` `{"name": "<facet>"}`: one facet.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use factorio_status_core::FacetName;

use crate::snapshot::SnapshotReader;

pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const PARSE_ERROR: i64 = -32700;

/// Serve requests on a bound listener until `cancel` fires or accept fails.
/// Removes the socket on exit either way.
pub async fn run_server(
    listener: UnixListener,
    socket_path: String,
    reader: SnapshotReader,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("UDS server listening on {socket_path}");

    let result = loop {
        let stream = tokio::select! {
            () = cancel.cancelled() => break Ok(()),
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => break Err(anyhow::Error::new(e).context("accept failed")),
            },
        };
        let reader = reader.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, reader).await {
                tracing::debug!("connection error: {e}");
            }
        });
    };

    drop(listener);
    remove_socket(&socket_path);
    tracing::info!("UDS server stopped");
    result
}

pub fn remove_socket(socket_path: &str) {
    if let Err(e) = std::fs::remove_file(socket_path) {
        tracing::debug!("cannot remove socket {socket_path}: {e}");
    }
}

/// Bind the socket, replacing a stale one. Fails if a live daemon owns it.
pub async fn bind(socket_path: &str) -> anyhow::Result<UnixListener> {
    // Socket directory is private to the user.
    let socket_dir = Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;
    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Stale socket from a crashed daemon
    if Path::new(socket_path).exists() {
        if UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(listener)
}

async fn handle_connection(stream: UnixStream, reader: SnapshotReader) -> anyhow::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read_half);
    let mut line = String::new();
    lines.read_line(&mut line).await?;

    let response = match serde_json::from_str::<serde_json::Value>(line.trim()) {
        Ok(request) => respond(&request, &reader),
        Err(e) => error_response(serde_json::Value::Null, PARSE_ERROR, &e.to_string()),
    };

    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;
    Ok(())
}

/// Build the response for one request.
pub(crate) fn respond(request: &serde_json::Value, reader: &SnapshotReader) -> serde_json::Value {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or("");

    let result = match method {
        "snapshot" => reader.snapshot_json(),
        "facet" => {
            let Some(name) = request["params"]["name"].as_str() else {
                return error_response(id, INVALID_PARAMS, "missing facet name");
            };
            let facet: FacetName = match name.parse() {
                Ok(facet) => facet,
                Err(e) => return error_response(id, INVALID_PARAMS, &format!("{e}")),
            };
            let mut value = reader.facet_json(facet);
            if let Some(object) = value.as_object_mut() {
                object.insert("name".to_string(), facet.as_str().into());
            }
            value
        }
        _ => return error_response(id, METHOD_NOT_FOUND, "method not found"),
    };

    serde_json::json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    })
}

fn error_response(id: serde_json::Value, code: i64, message: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": {"code": code, "message": message},
        "id": id,
    })
}
