//! Frames for the newline-delimited tool protocol.
//!
//! One JSON object per line, no embedded newlines. Requests carry a
//! channel-local monotonically increasing id; responses echo the id of the
//! request they answer, which is the only correlation mechanism - arrival
//! order means nothing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

/// Tool-side failure encoded inside a response frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
}

impl ResponseFrame {
    pub fn ok(id: u64, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    pub fn err(id: u64, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { id, result: None, error: Some(WireError { code: code.into(), message: message.into() }) }
    }
}

/// Error codes the tool servers emit. Free-form strings on the wire; these
/// constants keep both ends spelling them the same way.
pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_ARGUMENT: &str = "invalid_argument";
    pub const UNKNOWN_METHOD: &str = "unknown_method";
    pub const INTERNAL: &str = "internal";
}
