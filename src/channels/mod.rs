//! Front ends that feed messages to the router.

pub mod repl;
pub mod web;

pub use self::repl::ReplChannel;
pub use self::web::{GatewayState, start_server};
