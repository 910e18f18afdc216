//! Gemini `generateContent` provider.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};
use crate::llm::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::prompts::{ResponseFormat, templates};

pub const PROVIDER_NAME: &str = "gemini";

/// Gemini REST client.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    system_instruction: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            system_instruction: templates::SYSTEM_INSTRUCTION.to_string(),
        }
    }

    /// Build from config. Fails when no API key is configured.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.require_api_key()?,
            config.model.clone(),
            config.base_url.clone(),
        ))
    }

    /// Start a multi-turn chat that carries its history between messages.
    pub fn start_chat(&self) -> ChatSession<'_> {
        ChatSession {
            provider: self,
            history: Vec::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_body(&self, contents: Vec<Content>, format: &ResponseFormat) -> GenerateContentRequest {
        let generation_config = match format {
            ResponseFormat::Text => None,
            ResponseFormat::Enum(labels) => Some(GenerationConfig {
                response_mime_type: format.mime_type().to_string(),
                response_schema: serde_json::json!({ "type": "STRING", "enum": labels }),
            }),
            ResponseFormat::Json(schema) => Some(GenerationConfig {
                response_mime_type: format.mime_type().to_string(),
                response_schema: schema.clone(),
            }),
        };

        GenerateContentRequest {
            system_instruction: Content::text(None, &self.system_instruction),
            contents,
            generation_config,
        }
    }

    async fn complete(
        &self,
        contents: Vec<Content>,
        format: &ResponseFormat,
    ) -> Result<CompletionResponse, LlmError> {
        let body = self.build_body(contents, format);
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER_NAME.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    provider: PROVIDER_NAME.to_string(),
                    reason: e.to_string(),
                })?;

        let candidate_count = parsed.candidates.len();
        let first = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: "no candidates in response".to_string(),
            })?;

        let text: String = first
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!(
                    "empty candidate (finish reason: {})",
                    first.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }

        tracing::debug!(
            model = %self.model,
            mime_type = format.mime_type(),
            turns = body.contents.len(),
            response_len = text.len(),
            "gemini completion"
        );

        Ok(CompletionResponse {
            text,
            candidate_count,
            finish_reason: first.finish_reason,
        })
    }
}

/// A running Gemini conversation.
///
/// Each message is sent together with every earlier exchange. A failed
/// exchange leaves the history unchanged.
pub struct ChatSession<'a> {
    provider: &'a GeminiProvider,
    history: Vec<Content>,
}

impl ChatSession<'_> {
    pub async fn send_message(&mut self, text: &str) -> Result<String, LlmError> {
        let mut contents = self.history.clone();
        contents.push(Content::text(Some("user"), text));

        let response = self
            .provider
            .complete(contents.clone(), &ResponseFormat::Text)
            .await?;

        contents.push(Content::text(Some("model"), &response.text));
        self.history = contents;
        Ok(response.text)
    }

    /// Number of recorded turns, user and model messages counted separately.
    pub fn turns(&self) -> usize {
        self.history.len()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let contents = vec![Content::text(Some("user"), &request.prompt)];
        self.complete(contents, &request.format).await
    }
}
