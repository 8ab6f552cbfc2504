//! Intent routing and tool orchestration.
//!
//! This crate is the "brain" of shopmate: it turns a free-form catalog/order
//! query into tool calls and a formatted reply:
//!
//! 1. **Classification** (`classifier`) - a rule-based, bilingual, typo-
//!    tolerant stand-in for a language model, behind the [`IntentModel`]
//!    contract a real model would implement.
//! 2. **Extraction** (`extract`) - intent-specific parameter pulls over the
//!    normalized token stream; numbers verbatim, free text keeps its casing.
//! 3. **Orchestration** (`orchestrator`) - the per-query state machine:
//!    classify -> validate -> invoke -> format, with every failure degraded
//!    to a formatted reply.
//! 4. **Tool access** (`registry`) - the static name -> binding map; tools
//!    execute either over a subprocess channel or in-process (`tools`).
//!
//! # Safety principle
//!
//! The classifier is strictly a translator. It never prices anything and
//! never touches a tool; deterministic code downstream decides everything.

pub mod classifier;
pub mod extract;
pub mod format;
pub mod orchestrator;
pub mod registry;
pub mod runtime;
pub mod tools;

pub use classifier::{Classification, IntentModel, KeywordModel};
pub use orchestrator::{AgentReply, Orchestrator, ToolCallRecord};
pub use registry::{ToolBinding, ToolContract, ToolRegistry, ToolTransport};
pub use runtime::AgentRuntime;
