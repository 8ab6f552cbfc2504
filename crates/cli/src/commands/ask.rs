use uuid::Uuid;

use shopmate_agent::AgentRuntime;
use shopmate_core::config::{AppConfig, LoadOptions};

use super::CommandResult;

/// One-shot query: start the tool servers, run the pipeline once, shut the
/// servers down, print the reply with its timing metadata.
pub async fn run(query: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("ask", "config", error.to_string(), 2),
    };

    let runtime = match AgentRuntime::start(&config).await {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("ask", "tool_server", error.to_string(), 2),
    };

    let trace_id = Uuid::new_v4().to_string();
    let reply = runtime.handle_query(query, &trace_id).await;
    runtime.shutdown().await;

    let tool_lines = reply
        .tool_calls
        .iter()
        .map(|record| {
            format!("  {} -> {} ({} ms)", record.tool, record.outcome, record.duration.as_millis())
        })
        .collect::<Vec<_>>();

    let mut output = reply.reply;
    output.push_str(&format!(
        "\n\nintent: {}  duration: {} ms  trace: {}",
        reply.intent,
        reply.duration.as_millis(),
        trace_id
    ));
    if !tool_lines.is_empty() {
        output.push_str("\ntool calls:\n");
        output.push_str(&tool_lines.join("\n"));
    }

    CommandResult::plain(output)
}
