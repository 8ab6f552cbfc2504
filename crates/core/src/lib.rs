//! Domain model and shared contracts for the shopmate agent.
//!
//! This crate holds everything both sides of the system agree on:
//!
//! - `domain` - catalog and order records exchanged with the tool servers
//! - `intent` - the closed intent enumeration and extracted parameters
//! - `wire` - newline-delimited request/response frames for the tool protocol
//! - `errors` - the failure taxonomy shared by transport and orchestrator
//! - `config` - layered configuration (defaults -> TOML -> env -> overrides)
//!
//! The crate is deliberately I/O-free: no sockets, no subprocesses, no
//! database handles. Those live in `shopmate-transport` and `shopmate-db`.

pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod wire;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::{CatalogStatistics, NewProduct, Order, Product};
pub use errors::{AgentError, ChannelError};
pub use intent::{ExtractedParams, Intent, ParamType, ParamValue};
pub use wire::{RequestFrame, ResponseFrame, WireError};
