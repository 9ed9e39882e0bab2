//! The generation boundary: one prompt in, one script out.
//!
//! Prompt assembly only ever sees [`ScriptGenerator`], so the concrete
//! provider can be swapped (Gemini REST, any edgequake-llm provider, a test
//! stub) without touching the templates in [`crate::prompts`].
//!
//! Each user action issues exactly one request; a failure goes straight back
//! to the user with no retry.

use crate::error::GenerationError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Token usage reported by a provider, when it reports any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Text returned by a generator together with optional usage numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Generated {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Issue exactly one generation request.
    async fn generate(&self, prompt: &str) -> Result<Generated, GenerationError>;
}

/// Sampling knobs shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Adapter from an edgequake-llm provider to [`ScriptGenerator`].
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
    name: String,
    sampling: SamplingOptions,
}

impl ProviderGenerator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        name: impl Into<String>,
        sampling: SamplingOptions,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            sampling,
        }
    }
}

#[async_trait]
impl ScriptGenerator for ProviderGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<Generated, GenerationError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(&self.sampling);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify_provider_error(&self.name, &e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.name,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                provider: self.name.clone(),
            });
        }

        Ok(Generated {
            text: response.content,
            usage: Some(TokenUsage {
                input_tokens: response.prompt_tokens as usize,
                output_tokens: response.completion_tokens as usize,
            }),
        })
    }
}

/// Build `CompletionOptions` from the sampling knobs.
fn build_options(sampling: &SamplingOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(sampling.temperature),
        max_tokens: Some(sampling.max_tokens),
        ..Default::default()
    }
}

/// Sort a provider error message into the generation taxonomy.
///
/// edgequake-llm surfaces HTTP failures as text, so the status code or a
/// well-known phrase is the only signal available.
pub(crate) fn classify_provider_error(provider: &str, detail: &str) -> GenerationError {
    let lower = detail.to_lowercase();
    let provider = provider.to_string();
    let detail = detail.to_string();
    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("invalid api key")
        || lower.contains("authentication")
    {
        GenerationError::Auth { provider, detail }
    } else if lower.contains("429") || lower.contains("rate limit") || lower.contains("quota") {
        GenerationError::QuotaExceeded { provider, detail }
    } else if lower.contains("connect") || lower.contains("dns") || lower.contains("network") {
        GenerationError::Network { provider, detail }
    } else {
        GenerationError::Api {
            message: format!("{provider}: {detail}"),
        }
    }
}
