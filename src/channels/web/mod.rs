//! Web gateway: JSON chat API over HTTP.

pub mod server;
pub mod types;

pub use self::server::{GatewayState, RateLimiter, build_router, start_server};
pub use self::types::{ChatRequest, ChatResponse};
