//! Completion oracle.
//!
//! The router only needs single-shot completions: a rendered prompt in, text
//! out, optionally constrained to an enum label or a JSON schema. Gemini is
//! the production provider; tests plug in scripted providers. Gemini also
//! offers a stateful [`ChatSession`] for multi-turn use outside the router.

mod gemini;

use async_trait::async_trait;

pub use self::gemini::{ChatSession, GeminiProvider, PROVIDER_NAME as GEMINI_PROVIDER_NAME};
pub use crate::prompts::ResponseFormat;

use crate::error::LlmError;
use crate::prompts::FormattedPrompt;

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub format: ResponseFormat,
}

impl CompletionRequest {
    /// Free-form text completion.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: ResponseFormat::Text,
        }
    }
}

impl From<FormattedPrompt> for CompletionRequest {
    fn from(prompt: FormattedPrompt) -> Self {
        Self {
            prompt: prompt.text,
            format: prompt.format,
        }
    }
}

/// Provider output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    /// Number of candidates the provider returned.
    pub candidate_count: usize,
    /// Finish reason of the first candidate, when reported.
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            candidate_count: 1,
            finish_reason: None,
        }
    }
}

/// A completion oracle.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;

    async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
