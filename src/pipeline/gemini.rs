//! Native Gemini `generateContent` client.
//!
//! The key is handed in at construction and sent in the `x-goog-api-key`
//! header, never in the URL.

use crate::error::GenerationError;
use crate::pipeline::generate::{Generated, SamplingOptions, ScriptGenerator, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Public endpoint root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    sampling: SamplingOptions,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, sampling: SamplingOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            sampling,
        }
    }

    /// Point at a different endpoint root (proxies, regional gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl ScriptGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str) -> Result<Generated, GenerationError> {
        let start = Instant::now();
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.sampling.temperature,
                max_output_tokens: self.sampling.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network {
                provider: PROVIDER.to_string(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| GenerationError::Network {
            provider: PROVIDER.to_string(),
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }

        let generated = parse_generate_response(&text)?;
        debug!("gemini/{}: {} chars in {:?}", self.model, generated.text.len(), start.elapsed());
        Ok(generated)
    }
}

/// Map a non-2xx answer to the generation taxonomy.
fn classify_status(status: u16, body: &str) -> GenerationError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    let provider = PROVIDER.to_string();
    match status {
        401 | 403 => GenerationError::Auth { provider, detail },
        // Gemini reports a missing/invalid key as 400 INVALID_ARGUMENT.
        400 if detail.contains("API key") => GenerationError::Auth { provider, detail },
        429 => GenerationError::QuotaExceeded { provider, detail },
        _ => GenerationError::Api {
            message: format!("HTTP {status}: {detail}"),
        },
    }
}

/// Pull the script text out of a successful response body.
///
/// All text parts of the first candidate are joined in order; nothing else
/// is altered.
fn parse_generate_response(body: &str) -> Result<Generated, GenerationError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::MalformedResponse {
            detail: format!("{e}"),
        })?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::Blocked { reason });
    }

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::EmptyResponse {
            provider: PROVIDER.to_string(),
        })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                Err(GenerationError::Blocked {
                    reason: candidate.finish_reason.unwrap_or_default(),
                })
            }
            _ => Err(GenerationError::EmptyResponse {
                provider: PROVIDER.to_string(),
            }),
        };
    }

    Ok(Generated {
        text,
        usage: parsed.usage_metadata.map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        }),
    })
}
