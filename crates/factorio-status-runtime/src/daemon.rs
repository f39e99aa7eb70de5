//! Daemon: start the engine, serve the snapshot over UDS, and shut both
//! down on ctrl-c or SIGTERM.

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::server;

/// Bind the socket, start the engine, and serve until a shutdown signal.
/// A socket owned by another daemon, a failed engine start, or a server
/// failure is returned as an error.
pub async fn run_daemon(config: EngineConfig, socket_path: &str) -> anyhow::Result<()> {
    let mut engine = Engine::new(config)?;
    let listener = server::bind(socket_path)
        .await
        .with_context(|| format!("cannot listen on {socket_path}"))?;
    if let Err(e) = engine.start().await {
        drop(listener);
        server::remove_socket(socket_path);
        return Err(anyhow::Error::new(e).context("cannot start status engine"));
    }

    let cancel = CancellationToken::new();
    let mut server_handle = tokio::spawn(server::run_server(
        listener,
        socket_path.to_string(),
        engine.reader(),
        cancel.clone(),
    ));

    let finished = tokio::select! {
        () = shutdown_signal() => None,
        joined = &mut server_handle => {
            tracing::error!("UDS server exited unexpectedly");
            Some(joined)
        }
    };

    cancel.cancel();
    engine.stop().await;
    let joined = match finished {
        Some(joined) => joined,
        None => server_handle.await,
    };
    tracing::info!("daemon stopped");
    joined
        .context("server task ended abnormally")?
        .context("UDS server failed")
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            },
            Err(e) => {
                tracing::warn!("cannot register SIGTERM handler: {e}");
                if let Err(e) = ctrl_c.await {
                    tracing::warn!("cannot wait for ctrl-c: {e}");
                }
                tracing::info!("received ctrl-c, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, shutting down");
    }
}
