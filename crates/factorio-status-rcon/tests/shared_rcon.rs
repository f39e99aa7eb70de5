//! SharedRcon against an in-process fake RCON server over real TCP.

use std::time::Duration;

use factorio_status_rcon::frame::{self, AUTH_FAILED_ID, PacketType};
use factorio_status_rcon::{ConnectionState, RconConfig, RconError, SharedRcon};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const PASSWORD: &str = "s3cret";

/// Fake server: authenticates against `PASSWORD`, answers every command with
/// `echo <command>`, appends a trailer to `/config` commands, and hangs up on
/// `/hangup`.
async fn spawn_fake_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve_connection(stream));
        }
    });
    port
}

async fn read_frame(stream: &mut TcpStream) -> Option<frame::Frame> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.ok()?;
    let size = frame::declared_size(header).ok()?;
    let mut buf = vec![0u8; 4 + size];
    buf[..4].copy_from_slice(&header);
    stream.read_exact(&mut buf[4..]).await.ok()?;
    frame::decode(&buf).ok()
}

async fn write_frame(stream: &mut TcpStream, id: i32, packet_type: PacketType, body: &[u8]) {
    let bytes = frame::encode(id, packet_type, body).expect("encode");
    let _ = stream.write_all(&bytes).await;
}

async fn serve_connection(mut stream: TcpStream) {
    let Some(auth) = read_frame(&mut stream).await else {
        return;
    };
    if &auth.body[..] != PASSWORD.as_bytes() {
        write_frame(&mut stream, AUTH_FAILED_ID, PacketType::AUTH_RESPONSE, b"").await;
        return;
    }
    write_frame(&mut stream, auth.request_id, PacketType::AUTH_RESPONSE, b"").await;

    while let Some(request) = read_frame(&mut stream).await {
        let command = String::from_utf8_lossy(&request.body).into_owned();
        if command == "/hangup" {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
        let body = format!("echo {command}\n");
        write_frame(
            &mut stream,
            request.request_id,
            PacketType::RESPONSE_VALUE,
            body.as_bytes(),
        )
        .await;
        if command.starts_with("/config") {
            write_frame(&mut stream, request.request_id, PacketType::RESPONSE_VALUE, b"").await;
        }
    }
}

fn config(port: u16, password: &str) -> RconConfig {
    RconConfig::new("127.0.0.1", port, password).with_timeout(Duration::from_millis(500))
}

#[tokio::test]
async fn wrong_password_fails_open() {
    let port = spawn_fake_server().await;
    let err = SharedRcon::open(config(port, "wrong"))
        .await
        .err()
        .expect("open must fail");
    assert!(matches!(err, RconError::AuthenticationFailed));
}

#[tokio::test]
async fn refused_connection_is_classified() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let err = SharedRcon::open(config(port, PASSWORD))
        .await
        .err()
        .expect("open must fail");
    assert!(matches!(err, RconError::ConnectionRefused { .. }));
}

#[tokio::test]
async fn concurrent_commands_are_serialized() {
    let port = spawn_fake_server().await;
    let rcon = SharedRcon::open(config(port, PASSWORD)).await.expect("open");

    let mut handles = Vec::new();
    for i in 0..16 {
        let rcon = rcon.clone();
        handles.push(tokio::spawn(async move {
            let command = if i % 2 == 0 {
                format!("/players {i}")
            } else {
                format!("/config get option-{i}")
            };
            let body = rcon.run_command(&command).await.expect("command");
            assert_eq!(String::from_utf8(body).expect("utf8"), format!("echo {command}"));
        }));
    }
    for handle in handles {
        handle.await.expect("task");
    }
    assert_eq!(rcon.reconnects().await, 0);
}

#[tokio::test]
async fn failed_connection_is_replaced() {
    let port = spawn_fake_server().await;
    let rcon = SharedRcon::open(config(port, PASSWORD)).await.expect("open");

    let err = rcon.run_command("/hangup").await.expect_err("hangup");
    assert!(matches!(err, RconError::Closed));
    assert_eq!(rcon.state().await, ConnectionState::Failed);

    let body = rcon.run_command("/players").await.expect("after reconnect");
    assert_eq!(body, b"echo /players".to_vec());
    assert_eq!(rcon.reconnects().await, 1);
}

#[tokio::test]
async fn closed_handle_rejects_commands() {
    let port = spawn_fake_server().await;
    let rcon = SharedRcon::open(config(port, PASSWORD)).await.expect("open");

    rcon.close().await;
    rcon.close().await;
    let err = rcon.run_command("/players").await.expect_err("closed");
    assert!(matches!(err, RconError::NotReady(ConnectionState::Closed)));
}
