//! AI documentation summaries.
//!
//! Both supported providers speak the OpenAI `chat/completions` protocol.
//! Failures of any kind are logged and reported as "no summary"; nothing in
//! this module returns an error to the pipeline.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2000;

const SYSTEM_PROMPT: &str =
    "You are an expert code analyst specializing in generating clear, comprehensive documentation.";

/// Produces a documentation summary for concatenated source text.
pub trait SummaryGenerator {
    /// Returns the summary, or `None` if no backend produced one.
    fn generate(&self, text: &str, model: Option<&str>) -> Option<String>;
}

/// A text-generation provider with an OpenAI-compatible API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// api.openai.com
    OpenAi,
    /// api.x.ai
    Xai,
}

impl Provider {
    /// Preference order when no model is requested.
    pub const ALL: [Self; 2] = [Self::OpenAi, Self::Xai];

    /// Short provider name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Xai => "xai",
        }
    }

    /// API base URL.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Xai => "https://api.x.ai/v1",
        }
    }

    /// Environment variable holding the API key.
    #[must_use]
    pub const fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Xai => "XAI_API_KEY",
        }
    }

    /// Model used when none is requested.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Xai => "grok-2-1212",
        }
    }

    /// Picks the provider serving `model`: `grok*` goes to xAI.
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("grok") {
            Self::Xai
        } else {
            Self::OpenAi
        }
    }
}

/// Sends one prompt to one provider.
pub trait Completion {
    /// Returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Summary`] if the provider is unavailable or fails.
    fn complete(&self, provider: Provider, model: &str, prompt: &str) -> Result<String>;
}

/// Completion over HTTPS, with API keys read from the environment.
#[derive(Debug, Clone, Default)]
pub struct HttpCompletion;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat { kind: "text" },
        }
    }
}

impl Completion for HttpCompletion {
    fn complete(&self, provider: Provider, model: &str, prompt: &str) -> Result<String> {
        let name = provider.name();
        let api_key = env::var(provider.api_key_var())
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::summary(name, format!("{} not set", provider.api_key_var())))?;

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let url = format!("{}/chat/completions", provider.base_url());

        let response = client
            .post(&url)
            .bearer_auth(api_key)
            .json(&ChatRequest::new(model, prompt))
            .send()
            .map_err(|e| Error::summary(name, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::summary(name, e.to_string()))?;

        if !status.is_success() {
            return Err(Error::summary(name, format!("HTTP {status}: {body}")));
        }

        parse_response(&body).map_err(|message| Error::summary(name, message))
    }
}

fn parse_response(body: &str) -> std::result::Result<String, String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid response: {e}"))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| "response contained no content".to_string())
}

/// Builds the user prompt around the concatenated source.
#[must_use]
pub fn build_prompt(content: &str) -> String {
    format!(
        "Please analyze the following source code and generate a comprehensive README-style documentation.\n\
         Focus on:\n\
         1. Project structure and organization\n\
         2. Key functionality and features\n\
         3. Important classes and their purposes\n\
         4. Notable algorithms or patterns used\n\
         5. Dependencies and requirements\n\
         \n\
         Respond in markdown format.\n\
         \n\
         Source code:\n\
         \n\
         {content}\n"
    )
}

/// Tries providers in preference order and returns the first non-empty summary.
///
/// With a model override only the provider serving that model is tried.
#[derive(Debug, Clone, Default)]
pub struct ProviderChain<C = HttpCompletion> {
    completion: C,
}

impl<C: Completion> ProviderChain<C> {
    /// Creates a chain over a custom completion backend.
    pub const fn with_completion(completion: C) -> Self {
        Self { completion }
    }

    fn attempt(&self, provider: Provider, model: &str, prompt: &str) -> Option<String> {
        info!("Using AI model: {} ({})", model, provider.name());

        match self.completion.complete(provider, model, prompt) {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                debug!("{} returned an empty summary", provider.name());
                None
            }
            Err(e) => {
                warn!("Failed to generate summary with model {}: {}", model, e);
                None
            }
        }
    }
}

impl ProviderChain<HttpCompletion> {
    /// Creates a chain talking to the real provider APIs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            completion: HttpCompletion,
        }
    }
}

impl<C: Completion> SummaryGenerator for ProviderChain<C> {
    fn generate(&self, text: &str, model: Option<&str>) -> Option<String> {
        let prompt = build_prompt(text);

        if let Some(model) = model {
            return self.attempt(Provider::for_model(model), model, &prompt);
        }

        Provider::ALL
            .iter()
            .find_map(|&provider| self.attempt(provider, provider.default_model(), &prompt))
    }
}
