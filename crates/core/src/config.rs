use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Reply language when the query language cannot be detected.
    pub default_language: ReplyLanguage,
    /// Minimum weighted keyword score before a query is routed anywhere.
    pub min_intent_score: u32,
    pub tool_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ToolsConfig {
    pub products: ToolServerConfig,
    pub orders: ToolServerConfig,
}

/// How to launch one tool-server subprocess.
#[derive(Clone, Debug)]
pub struct ToolServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub shutdown_grace_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyLanguage {
    En,
    Ru,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub default_language: Option<ReplyLanguage>,
    pub tool_timeout_ms: Option<u64>,
    pub products_command: Option<String>,
    pub orders_command: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://shopmate.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            agent: AgentConfig {
                default_language: ReplyLanguage::En,
                min_intent_score: 3,
                tool_timeout_ms: 5_000,
            },
            tools: ToolsConfig {
                products: ToolServerConfig {
                    command: "shopmate-toolserver".to_string(),
                    args: vec!["--role".to_string(), "products".to_string()],
                    shutdown_grace_ms: 2_000,
                },
                orders: ToolServerConfig {
                    command: "shopmate-toolserver".to_string(),
                    args: vec!["--role".to_string(), "orders".to_string()],
                    shutdown_grace_ms: 2_000,
                },
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for ReplyLanguage {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "ru" | "russian" => Ok(Self::Ru),
            other => Err(ConfigError::Validation(format!(
                "unsupported reply language `{other}` (expected en|ru)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopmate.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(default_language) = agent.default_language {
                self.agent.default_language = default_language;
            }
            if let Some(min_intent_score) = agent.min_intent_score {
                self.agent.min_intent_score = min_intent_score;
            }
            if let Some(tool_timeout_ms) = agent.tool_timeout_ms {
                self.agent.tool_timeout_ms = tool_timeout_ms;
            }
        }

        if let Some(tools) = patch.tools {
            if let Some(products) = tools.products {
                apply_tool_patch(&mut self.tools.products, products);
            }
            if let Some(orders) = tools.orders {
                apply_tool_patch(&mut self.tools.orders, orders);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("SHOPMATE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(level) = env::var("SHOPMATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("SHOPMATE_LOG_FORMAT") {
            self.logging.format = format.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "SHOPMATE_LOG_FORMAT".to_string(),
                value: format.clone(),
            })?;
        }
        if let Ok(language) = env::var("SHOPMATE_DEFAULT_LANGUAGE") {
            self.agent.default_language =
                language.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "SHOPMATE_DEFAULT_LANGUAGE".to_string(),
                    value: language.clone(),
                })?;
        }
        if let Ok(timeout) = env::var("SHOPMATE_TOOL_TIMEOUT_MS") {
            self.agent.tool_timeout_ms =
                timeout.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "SHOPMATE_TOOL_TIMEOUT_MS".to_string(),
                    value: timeout.clone(),
                })?;
        }
        if let Ok(command) = env::var("SHOPMATE_PRODUCTS_COMMAND") {
            self.tools.products.command = command;
        }
        if let Ok(command) = env::var("SHOPMATE_ORDERS_COMMAND") {
            self.tools.orders.command = command;
        }
        if let Ok(bind_address) = env::var("SHOPMATE_BIND_ADDRESS") {
            self.server.bind_address = bind_address;
        }
        if let Ok(port) = env::var("SHOPMATE_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "SHOPMATE_PORT".to_string(),
                value: port.clone(),
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(language) = overrides.default_language {
            self.agent.default_language = language;
        }
        if let Some(timeout) = overrides.tool_timeout_ms {
            self.agent.tool_timeout_ms = timeout;
        }
        if let Some(command) = overrides.products_command {
            self.tools.products.command = command;
        }
        if let Some(command) = overrides.orders_command {
            self.tools.orders.command = command;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.agent.tool_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "agent.tool_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.agent.min_intent_score == 0 {
            return Err(ConfigError::Validation(
                "agent.min_intent_score must be greater than zero".to_string(),
            ));
        }
        if self.tools.products.command.trim().is_empty()
            || self.tools.orders.command.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "tool server commands must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn apply_tool_patch(target: &mut ToolServerConfig, patch: ToolServerPatch) {
    if let Some(command) = patch.command {
        target.command = command;
    }
    if let Some(args) = patch.args {
        target.args = args;
    }
    if let Some(shutdown_grace_ms) = patch.shutdown_grace_ms {
        target.shutdown_grace_ms = shutdown_grace_ms;
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(env_path) = env::var("SHOPMATE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    let default = PathBuf::from("shopmate.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    agent: Option<AgentPatch>,
    tools: Option<ToolsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AgentPatch {
    default_language: Option<ReplyLanguage>,
    min_intent_score: Option<u32>,
    tool_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ToolsPatch {
    products: Option<ToolServerPatch>,
    orders: Option<ToolServerPatch>,
}

#[derive(Debug, Deserialize)]
struct ToolServerPatch {
    command: Option<String>,
    args: Option<Vec<String>>,
    shutdown_grace_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, ReplyLanguage};

    #[test]
    fn defaults_validate() {
        let config = AppConfig::load(LoadOptions::default()).expect("defaults should load");
        assert_eq!(config.agent.default_language, ReplyLanguage::En);
        assert_eq!(config.agent.min_intent_score, 3);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.tools.products.args, vec!["--role", "products"]);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                default_language: Some(ReplyLanguage::Ru),
                tool_timeout_ms: Some(50),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("load with overrides");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.agent.default_language, ReplyLanguage::Ru);
        assert_eq!(config.agent.tool_timeout_ms, 50);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                tool_timeout_ms: Some(0),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("validation error").to_string();
        assert!(message.contains("tool_timeout_ms"));
    }

    #[test]
    fn language_parses_from_str() {
        assert_eq!("ru".parse::<ReplyLanguage>().expect("parse"), ReplyLanguage::Ru);
        assert_eq!("English".parse::<ReplyLanguage>().expect("parse"), ReplyLanguage::En);
        assert!("fr".parse::<ReplyLanguage>().is_err());
    }
}
