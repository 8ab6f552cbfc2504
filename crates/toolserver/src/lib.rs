//! Tool server speaking the newline-delimited protocol on stdio.
//!
//! One binary, two roles: `--role products` serves the catalog methods,
//! `--role orders` serves order creation. stdout carries protocol frames
//! only - logs go to stderr.

pub mod service;

pub use service::{serve, Role, ToolService};
