use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;

use shopmate_core::config::{AppConfig, LoadOptions, ToolServerConfig};
use shopmate_core::errors::ChannelError;
use shopmate_db::{connect_with_settings, ping};
use shopmate_transport::{ChannelConfig, ToolChannel};

use super::CommandResult;

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
    duration_ms: u64,
}

/// Readiness checks with per-check timing: config, database, and both tool
/// servers (spawned, probed over the protocol, then stopped).
pub async fn run(json: bool) -> CommandResult {
    let mut checks = Vec::new();

    let started = Instant::now();
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "ok",
                detail: "configuration loaded and validated".to_string(),
                duration_ms: elapsed_ms(started),
            });
            config
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "error",
                detail: error.to_string(),
                duration_ms: elapsed_ms(started),
            });
            return render(json, checks);
        }
    };

    let started = Instant::now();
    match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => {
            let detail = match ping(&pool).await {
                Ok(()) => ("ok", "database reachable and answering queries".to_string()),
                Err(error) => ("error", format!("database query failed: {error}")),
            };
            checks.push(DoctorCheck {
                name: "database",
                status: detail.0,
                detail: detail.1,
                duration_ms: elapsed_ms(started),
            });
            pool.close().await;
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "database",
                status: "error",
                detail: format!("connection failed: {error}"),
                duration_ms: elapsed_ms(started),
            });
        }
    }

    checks.push(probe_tool_server("products_server", &config, &config.tools.products, "statistics").await);
    // The orders role answers any known-shape frame; a deliberately empty
    // create_order probe proves liveness without creating an order.
    checks.push(probe_tool_server("orders_server", &config, &config.tools.orders, "create_order").await);

    render(json, checks)
}

async fn probe_tool_server(
    name: &'static str,
    config: &AppConfig,
    tool: &ToolServerConfig,
    probe_method: &str,
) -> DoctorCheck {
    let started = Instant::now();

    let mut channel_config = ChannelConfig::new(name, tool.command.clone());
    channel_config.args = tool.args.clone();
    channel_config.envs =
        vec![("SHOPMATE_DATABASE_URL".to_string(), config.database.url.clone())];
    channel_config.call_timeout = Duration::from_millis(config.agent.tool_timeout_ms);
    channel_config.shutdown_grace = Duration::from_millis(tool.shutdown_grace_ms);

    let channel = match ToolChannel::start(channel_config).await {
        Ok(channel) => channel,
        Err(error) => {
            return DoctorCheck {
                name,
                status: "error",
                detail: format!("launch failed: {error}"),
                duration_ms: elapsed_ms(started),
            };
        }
    };

    let outcome = channel.call(probe_method, json!({})).await;
    channel.stop().await;

    let (status, detail) = match outcome {
        // A structured tool-side error still proves the server is speaking
        // the protocol.
        Ok(_) | Err(ChannelError::Tool { .. }) => {
            ("ok", "subprocess launched and answered a protocol frame".to_string())
        }
        Err(error) => ("error", format!("no protocol response: {error}")),
    };

    DoctorCheck { name, status, detail, duration_ms: elapsed_ms(started) }
}

fn render(json: bool, checks: Vec<DoctorCheck>) -> CommandResult {
    let failed = checks.iter().filter(|check| check.status != "ok").count();
    let status = if failed == 0 { "ok" } else { "error" };

    let output = if json {
        serde_json::to_string_pretty(&json!({
            "command": "doctor",
            "status": status,
            "checks": checks,
        }))
        .unwrap_or_else(|error| format!("doctor: output encoding failed: {error}"))
    } else {
        let mut lines = checks
            .iter()
            .map(|check| {
                format!(
                    "[{}] {} ({} ms) - {}",
                    if check.status == "ok" { "ok" } else { "!!" },
                    check.name,
                    check.duration_ms,
                    check.detail
                )
            })
            .collect::<Vec<_>>();
        lines.push(format!("doctor: {status} ({} checks, {failed} failed)", checks.len()));
        lines.join("\n")
    };

    CommandResult { exit_code: if failed == 0 { 0 } else { 2 }, output }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
