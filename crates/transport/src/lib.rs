//! Subprocess transport for tool servers.
//!
//! A [`ToolChannel`] owns one long-lived tool-server subprocess and speaks
//! the newline-delimited request/response protocol over its stdio. Requests
//! carry channel-local monotonically increasing ids; a single reader task
//! demultiplexes response frames back to waiting callers by id, so multiple
//! calls can be in flight on one channel and responses may arrive in any
//! order.
//!
//! Only this crate touches the subprocess streams. Everything else goes
//! through [`ToolChannel::call`].

mod channel;

pub use channel::{ChannelConfig, ToolChannel};
