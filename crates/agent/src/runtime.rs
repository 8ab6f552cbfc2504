//! Process-level wiring: tool-server channels + registry + orchestrator.
//!
//! Channels are started once at initialization and reused for the lifetime
//! of the runtime; every boundary (HTTP server, CLI) shares this setup.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use shopmate_core::config::{AppConfig, ToolServerConfig};
use shopmate_core::errors::ChannelError;
use shopmate_transport::{ChannelConfig, ToolChannel};

use crate::classifier::KeywordModel;
use crate::orchestrator::{AgentReply, Orchestrator};
use crate::registry::{ToolRegistry, ToolTransport};

pub struct AgentRuntime {
    orchestrator: Orchestrator,
    products: Arc<ToolChannel>,
    orders: Arc<ToolChannel>,
}

impl AgentRuntime {
    /// Launches both tool-server subprocesses and assembles the pipeline.
    pub async fn start(config: &AppConfig) -> Result<Self, ChannelError> {
        let products = Arc::new(
            ToolChannel::start(channel_config("products", &config.tools.products, config)).await?,
        );
        info!(
            event_name = "runtime.channel_started",
            channel = "products",
            command = %config.tools.products.command,
            "tool server channel started"
        );

        let orders = Arc::new(
            ToolChannel::start(channel_config("orders", &config.tools.orders, config)).await?,
        );
        info!(
            event_name = "runtime.channel_started",
            channel = "orders",
            command = %config.tools.orders.command,
            "tool server channel started"
        );

        let registry = ToolRegistry::standard(
            Arc::clone(&products) as Arc<dyn ToolTransport>,
            Arc::clone(&orders) as Arc<dyn ToolTransport>,
        );
        let orchestrator = Orchestrator::new(
            Box::new(KeywordModel::new(config.agent.min_intent_score)),
            registry,
            config.agent.default_language,
            Duration::from_millis(config.agent.tool_timeout_ms),
        );

        Ok(Self { orchestrator, products, orders })
    }

    pub async fn handle_query(&self, query: &str, trace_id: &str) -> AgentReply {
        self.orchestrator.handle_query(query, trace_id).await
    }

    /// Channel names with their readiness, for health reporting.
    pub fn channel_health(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("products", !self.products.is_degraded()),
            ("orders", !self.orders.is_degraded()),
        ]
    }

    /// Stops both subprocesses; safe to call more than once.
    pub async fn shutdown(&self) {
        self.products.stop().await;
        self.orders.stop().await;
    }
}

fn channel_config(
    name: &'static str,
    tool: &ToolServerConfig,
    config: &AppConfig,
) -> ChannelConfig {
    let mut channel = ChannelConfig::new(name, tool.command.clone());
    channel.args = tool.args.clone();
    channel.envs =
        vec![("SHOPMATE_DATABASE_URL".to_string(), config.database.url.clone())];
    channel.call_timeout = Duration::from_millis(config.agent.tool_timeout_ms);
    channel.shutdown_grace = Duration::from_millis(tool.shutdown_grace_ms);
    channel
}
