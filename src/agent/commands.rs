//! Slash commands.
//!
//! Commands bypass classification and every pending state.

use crate::agent::router::Router;
use crate::agent::session::ConversationSession;
use crate::error::Error;

pub const RESET_ACK: &str = "Reset completed";
pub const UNKNOWN_COMMAND: &str = "Unknown command";

/// A recognized control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drop the pending transaction and the account.
    Reset,
    /// List available commands.
    Help,
    /// Show the native-token balance of the session account.
    Balance,
}

impl Command {
    /// Parse the command text that follows the prefix. Case-sensitive.
    pub fn parse(body: &str) -> Option<Self> {
        match body.trim() {
            "reset" => Some(Self::Reset),
            "help" => Some(Self::Help),
            "balance" => Some(Self::Balance),
            _ => None,
        }
    }
}

fn help_text(prefix: &str) -> String {
    format!(
        "Available commands:\n\
         {prefix}reset - forget the pending transaction and the generated account\n\
         {prefix}balance - show the balance of your account\n\
         {prefix}help - show this message\n\
         \n\
         Anything else is read as a request: create an account, send tokens, \
         request an attestation, or just chat."
    )
}

impl Router {
    /// Run the command in `body` (prefix already stripped) against the session.
    pub(super) async fn run_command(
        &self,
        session: &mut ConversationSession,
        body: &str,
    ) -> Result<String, Error> {
        match Command::parse(body) {
            Some(Command::Reset) => {
                session.reset();
                tracing::info!(session_id = %session.id(), "session reset");
                Ok(RESET_ACK.to_string())
            }
            Some(Command::Help) => Ok(help_text(self.command_prefix())),
            Some(Command::Balance) => self.handle_balance(session).await,
            None => {
                tracing::debug!(session_id = %session.id(), command = %body, "unknown command");
                Ok(UNKNOWN_COMMAND.to_string())
            }
        }
    }
}
