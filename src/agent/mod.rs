//! Conversational agent: sessions, intent routing and handlers.

mod attestation;
pub mod commands;
mod handlers;
pub mod intent;
pub mod router;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use self::intent::{Intent, IntentClassifier};
pub use self::router::Router;
pub use self::session::{
    ConversationSession, DEFAULT_SESSION_ID, PendingTransaction, SessionManager, Turn,
};
