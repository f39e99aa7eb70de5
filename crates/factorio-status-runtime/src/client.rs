//! UDS JSON-RPC client for the `status` subcommand.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub(crate) async fn rpc_call(
    socket_path: &str,
    method: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))?;

    let (reader, mut writer) = stream.into_split();

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;
    writer.shutdown().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: serde_json::Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        anyhow::bail!("RPC error: {error}");
    }

    Ok(response["result"].clone())
}

/// `factorio-status status`: human summary, or the raw snapshot with `--json`.
pub async fn cmd_status(socket_path: &str, json: bool) -> anyhow::Result<()> {
    let snapshot = rpc_call(socket_path, "snapshot", serde_json::json!({})).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", format_status(&snapshot));
    }
    Ok(())
}

/// Pure formatting logic for the status summary, separated for testability.
pub(crate) fn format_status(snapshot: &serde_json::Value) -> String {
    let name = snapshot["server"]["name"].as_str().unwrap_or("Factorio Server");
    let port = &snapshot["server"]["port"];
    let mut out = match snapshot["server_ip"]["value"].as_str() {
        Some(host) => format!("{name} ({host}:{port})\n"),
        None => format!("{name} (port {port})\n"),
    };

    let players = facet_values(snapshot, "players");
    let online: Vec<&str> = players
        .iter()
        .filter(|p| p["is_online"].as_bool() == Some(true))
        .filter_map(|p| p["username"].as_str())
        .collect();
    out.push_str(&format!("Players: {}/{} online", online.len(), players.len()));
    if !online.is_empty() {
        out.push_str(&format!(" ({})", online.join(", ")));
    }
    out.push('\n');

    let admins: Vec<String> = facet_values(snapshot, "admins")
        .iter()
        .filter_map(|a| {
            let username = a["username"].as_str()?;
            Some(if a["is_online"].as_bool() == Some(true) {
                format!("{username}*")
            } else {
                username.to_string()
            })
        })
        .collect();
    if !admins.is_empty() {
        out.push_str(&format!("Admins: {}\n", admins.join(", ")));
    }

    let mods = facet_values(snapshot, "mods");
    if !mods.is_empty() {
        let enabled = mods
            .iter()
            .filter(|m| m["enabled"].as_bool() == Some(true))
            .count();
        out.push_str(&format!("Mods: {enabled} enabled, {} installed\n", mods.len()));
    }

    if let Some(config) = snapshot["server_config"]["value"].as_object() {
        for (option, value) in config {
            let shown = match &value["value"] {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => "-".to_string(),
                serde_json::Value::Object(password) => password
                    .get("value")
                    .or_else(|| password.get("state"))
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                other => other.to_string(),
            };
            out.push_str(&format!("  {option}: {shown}\n"));
        }
    }

    out
}

fn facet_values<'a>(snapshot: &'a serde_json::Value, name: &str) -> &'a [serde_json::Value] {
    snapshot[name]["value"].as_array().map_or(&[], Vec::as_slice)
}
