//! Attestation challenge and nonce exchange.
//!
//! A `RequestAttestation` intent asks the user for a nonce and arms the
//! session flag. The next non-command, non-confirmation message is taken as
//! the nonce; the flag is cleared whatever the outcome.

use crate::agent::router::Router;
use crate::agent::session::ConversationSession;
use crate::attestation::TokenRequest;
use crate::error::Error;
use crate::llm::CompletionRequest;

impl Router {
    pub(super) async fn handle_attestation_request(
        &self,
        session: &mut ConversationSession,
    ) -> Result<String, Error> {
        let prompt = self.prompts.format("request_attestation", &[])?;
        let response = self.generate(CompletionRequest::from(prompt)).await?;
        session.expect_nonce();
        tracing::debug!(session_id = %session.id(), "awaiting attestation nonce");
        Ok(response.text)
    }

    pub(super) async fn consume_nonce(
        &self,
        session: &mut ConversationSession,
        message: &str,
    ) -> Result<String, Error> {
        session.take_nonce_flag();

        let request = TokenRequest::new(
            vec![message.to_string()],
            self.attestation.audience(),
            self.attestation.token_type(),
        )?;
        let token = self
            .attestation_call(self.attestation.request_token(&request))
            .await?;
        tracing::info!(session_id = %session.id(), "issued attestation token");
        Ok(token)
    }
}
