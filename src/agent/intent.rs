//! Intent classification.
//!
//! One completion call per message, constrained to the intent labels.
//! Classification fails open: any oracle error, timeout or unexpected label
//! becomes [`Intent::Conversational`].

use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::prompts::PromptLibrary;

/// What the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    GenerateAccount,
    SendToken,
    SwapToken,
    RequestAttestation,
    Conversational,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::GenerateAccount,
        Intent::SendToken,
        Intent::SwapToken,
        Intent::RequestAttestation,
        Intent::Conversational,
    ];

    /// Label the completion oracle is constrained to.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GenerateAccount => "GenerateAccount",
            Self::SendToken => "SendToken",
            Self::SwapToken => "SwapToken",
            Self::RequestAttestation => "RequestAttestation",
            Self::Conversational => "Conversational",
        }
    }

    /// Parse an oracle label. Surrounding whitespace and quotes are ignored;
    /// the label itself must match exactly.
    pub fn from_label(raw: &str) -> Option<Self> {
        let label = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        Self::ALL.into_iter().find(|intent| intent.label() == label)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a message to an [`Intent`] through the completion oracle.
pub struct IntentClassifier {
    llm: Arc<dyn CompletionProvider>,
    timeout: Duration,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn CompletionProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Classify a message. Never fails.
    pub async fn classify(&self, prompts: &PromptLibrary, message: &str) -> Intent {
        match self.try_classify(prompts, message).await {
            Ok(intent) => intent,
            Err(reason) => {
                tracing::warn!(%reason, "intent classification failed, falling back to conversational");
                Intent::Conversational
            }
        }
    }

    async fn try_classify(&self, prompts: &PromptLibrary, message: &str) -> Result<Intent, String> {
        let prompt = prompts
            .format("semantic_router", &[("user_input", message)])
            .map_err(|e| e.to_string())?;

        let response = tokio::time::timeout(
            self.timeout,
            self.llm.generate(CompletionRequest::from(prompt)),
        )
        .await
        .map_err(|_| {
            LlmError::Timeout {
                provider: self.llm.name().to_string(),
                after: self.timeout,
            }
            .to_string()
        })?
        .map_err(|e| e.to_string())?;

        let intent = Intent::from_label(&response.text)
            .ok_or_else(|| format!("unexpected label '{}'", response.text.trim()))?;
        tracing::debug!(%intent, "classified message");
        Ok(intent)
    }
}
