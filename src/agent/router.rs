//! Message routing.
//!
//! Every message is consumed in a fixed priority order:
//!
//! 1. a command (prefix match) runs the command interceptor and nothing else;
//! 2. a byte-exact resend of the pending transaction's message confirms it;
//! 3. while an attestation challenge is open, the message is the nonce;
//! 4. otherwise the intent is classified and dispatched to a handler.
//!
//! [`Router::handle`] never fails: internal errors become `Error: ...` replies.

use std::future::Future;
use std::sync::Arc;

use crate::agent::intent::{Intent, IntentClassifier};
use crate::agent::session::{ConversationSession, SessionManager, Turn};
use crate::attestation::AttestationProvider;
use crate::chain::ChainClient;
use crate::config::AgentConfig;
use crate::error::{AttestationError, ChainError, Error, LlmError};
use crate::llm::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::prompts::PromptLibrary;

/// Routes messages to commands, pending-state continuations and intent
/// handlers.
pub struct Router {
    pub(super) llm: Arc<dyn CompletionProvider>,
    pub(super) chain: Arc<dyn ChainClient>,
    pub(super) attestation: Arc<dyn AttestationProvider>,
    pub(super) prompts: PromptLibrary,
    classifier: IntentClassifier,
    pub(super) config: AgentConfig,
}

impl Router {
    pub fn new(
        llm: Arc<dyn CompletionProvider>,
        chain: Arc<dyn ChainClient>,
        attestation: Arc<dyn AttestationProvider>,
        config: AgentConfig,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(Arc::clone(&llm), config.oracle_timeout),
            llm,
            chain,
            attestation,
            prompts: PromptLibrary::new(),
            config,
        }
    }

    /// Replace the prompt library.
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn command_prefix(&self) -> &str {
        &self.config.command_prefix
    }

    /// Handle one message for `session` and return the reply.
    pub async fn handle(&self, session: &mut ConversationSession, message: &str) -> String {
        let turn = session.resolve(message, &self.config.command_prefix);
        tracing::debug!(session_id = %session.id(), ?turn, "resolved turn");

        let result = match turn {
            Turn::Command(body) => self.run_command(session, body).await,
            Turn::Confirm => self.confirm_pending_tx(session).await,
            Turn::Nonce => self.consume_nonce(session, message).await,
            Turn::Classify => {
                let intent = self.classifier.classify(&self.prompts, message).await;
                tracing::info!(session_id = %session.id(), %intent, "routing message");
                self.dispatch(intent, session, message).await
            }
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(session_id = %session.id(), error = %e, "message handling failed");
                format!("Error: {}", e)
            }
        }
    }

    /// Lock the session for `session_id` and handle the message.
    ///
    /// The session lock is held for the whole turn, so messages of one
    /// session are processed in arrival order.
    pub async fn handle_message(
        &self,
        sessions: &SessionManager,
        session_id: &str,
        message: &str,
    ) -> String {
        let session = sessions.get_or_create_session(session_id).await;
        let mut session = session.lock().await;
        self.handle(&mut session, message).await
    }

    async fn dispatch(
        &self,
        intent: Intent,
        session: &mut ConversationSession,
        message: &str,
    ) -> Result<String, Error> {
        match intent {
            Intent::GenerateAccount => self.handle_generate_account(session).await,
            Intent::SendToken => self.handle_send_token(session, message).await,
            Intent::SwapToken => Ok(self.handle_swap_token(message)),
            Intent::RequestAttestation => self.handle_attestation_request(session).await,
            Intent::Conversational => self.handle_conversation(message).await,
        }
    }

    /// One completion call under the oracle timeout.
    pub(super) async fn generate(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let after = self.config.oracle_timeout;
        tokio::time::timeout(after, self.llm.generate(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.llm.name().to_string(),
                after,
            })?
    }

    /// Run a chain call under the oracle timeout.
    pub(super) async fn chain_call<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, ChainError>>,
    ) -> Result<T, ChainError> {
        let after = self.config.oracle_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| ChainError::Timeout {
                operation: operation.to_string(),
                after,
            })?
    }

    /// Run an attestation call under the oracle timeout.
    pub(super) async fn attestation_call<T>(
        &self,
        call: impl Future<Output = Result<T, AttestationError>>,
    ) -> Result<T, AttestationError> {
        let after = self.config.oracle_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| AttestationError::Timeout { after })?
    }
}
