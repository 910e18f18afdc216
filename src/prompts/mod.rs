//! Prompt library.
//!
//! Every oracle call the router makes goes through a named prompt. A prompt
//! carries its template, the inputs it requires and the response format the
//! completion oracle is constrained to (plain text, one label out of an
//! enumeration, or JSON matching a schema).

pub mod templates;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::json;

use crate::agent::intent::Intent;
use crate::error::PromptError;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Output constraint passed to the completion oracle.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    /// Exactly one of the labels, nothing else.
    Enum(Vec<String>),
    /// JSON matching the schema (OpenAPI subset).
    Json(serde_json::Value),
}

impl ResponseFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Enum(_) => "text/x.enum",
            Self::Json(_) => "application/json",
        }
    }
}

/// A named prompt template.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub template: String,
    pub required_inputs: Vec<String>,
    pub response_format: ResponseFormat,
    pub category: Option<String>,
}

impl Prompt {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            template: template.into(),
            required_inputs: Vec::new(),
            response_format: ResponseFormat::Text,
            category: None,
        }
    }

    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.required_inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Substitute `${name}` placeholders.
    ///
    /// Values are inserted verbatim. Placeholders without a value are left
    /// as-is; a missing *required* input is an error.
    pub fn format(&self, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        let missing: Vec<String> = self
            .required_inputs
            .iter()
            .filter(|input| !vars.iter().any(|(key, _)| key == *input))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PromptError::MissingInput {
                prompt: self.name.clone(),
                missing,
            });
        }
        if self.required_inputs.is_empty() {
            return Ok(self.template.clone());
        }

        let formatted = PLACEHOLDER.replace_all(&self.template, |caps: &Captures<'_>| {
            let key = &caps[1];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(formatted.into_owned())
    }
}

/// A prompt rendered and ready for the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedPrompt {
    pub text: String,
    pub format: ResponseFormat,
}

/// Registry of prompts by name.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: HashMap<String, Prompt>,
}

impl PromptLibrary {
    /// Library pre-loaded with the router's prompts.
    pub fn new() -> Self {
        let mut library = Self {
            prompts: HashMap::new(),
        };
        for prompt in default_prompts() {
            library.add_prompt(prompt);
        }
        library
    }

    /// Add or replace a prompt.
    pub fn add_prompt(&mut self, prompt: Prompt) {
        tracing::debug!(name = %prompt.name, category = ?prompt.category, "prompt added");
        self.prompts.insert(prompt.name.clone(), prompt);
    }

    pub fn get_prompt(&self, name: &str) -> Result<&Prompt, PromptError> {
        self.prompts.get(name).ok_or_else(|| {
            tracing::error!(name, "prompt not found");
            PromptError::NotFound(name.to_string())
        })
    }

    /// Render a prompt together with its response format.
    pub fn format(&self, name: &str, vars: &[(&str, &str)]) -> Result<FormattedPrompt, PromptError> {
        let prompt = self.get_prompt(name)?;
        Ok(FormattedPrompt {
            text: prompt.format(vars)?,
            format: prompt.response_format.clone(),
        })
    }

    pub fn prompts_by_category(&self, category: &str) -> Vec<&Prompt> {
        let mut prompts: Vec<&Prompt> = self
            .prompts
            .values()
            .filter(|p| p.category.as_deref() == Some(category))
            .collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema for token-send extraction: `{to_address, amount}`.
pub fn token_send_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "to_address": { "type": "STRING" },
            "amount": { "type": "NUMBER" }
        }
    })
}

/// Schema for token-swap extraction: `{from_token, to_token, amount}`.
pub fn token_swap_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "from_token": { "type": "STRING" },
            "to_token": { "type": "STRING" },
            "amount": { "type": "NUMBER" }
        }
    })
}

fn default_prompts() -> Vec<Prompt> {
    let intent_labels = Intent::ALL.iter().map(|i| i.label().to_string()).collect();

    vec![
        Prompt::new(
            "semantic_router",
            "Route user query based on user input",
            templates::SEMANTIC_ROUTER,
        )
        .with_inputs(&["user_input"])
        .with_format(ResponseFormat::Enum(intent_labels))
        .with_category("router"),
        Prompt::new(
            "token_send",
            "Extract token send parameters from user input",
            templates::TOKEN_SEND,
        )
        .with_inputs(&["user_input"])
        .with_format(ResponseFormat::Json(token_send_schema()))
        .with_category("defai"),
        Prompt::new(
            "follow_up_token_send",
            "Ask the user for missing transfer details",
            templates::FOLLOW_UP_TOKEN_SEND,
        )
        .with_category("defai"),
        Prompt::new(
            "token_swap",
            "Extract token swap parameters from user input",
            templates::TOKEN_SWAP,
        )
        .with_inputs(&["user_input"])
        .with_format(ResponseFormat::Json(token_swap_schema()))
        .with_category("defai"),
        Prompt::new(
            "generate_account",
            "Announce a newly generated account",
            templates::GENERATE_ACCOUNT,
        )
        .with_inputs(&["address"])
        .with_category("account"),
        Prompt::new(
            "conversational",
            "Converse with a user",
            templates::CONVERSATIONAL,
        )
        .with_inputs(&["user_input"])
        .with_category("conversational"),
        Prompt::new(
            "request_attestation",
            "User has requested a remote attestation",
            templates::REQUEST_ATTESTATION,
        )
        .with_category("conversational"),
        Prompt::new(
            "tx_confirmation",
            "Confirm a user's transaction",
            templates::TX_CONFIRMATION,
        )
        .with_inputs(&["tx_url"])
        .with_category("account"),
    ]
}
