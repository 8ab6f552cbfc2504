use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use shopmate_agent::AgentRuntime;
use shopmate_core::config::{AppConfig, ConfigError, LoadOptions};
use shopmate_core::errors::ChannelError;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("tool server startup failed: {0}")]
    ToolServer(#[source] ChannelError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        trace_id = "bootstrap",
        "starting application bootstrap"
    );

    let runtime =
        AgentRuntime::start(&config).await.map_err(BootstrapError::ToolServer)?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        trace_id = "bootstrap",
        "agent runtime initialized"
    );

    Ok(Application { config, runtime: Arc::new(runtime) })
}
