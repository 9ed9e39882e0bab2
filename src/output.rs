//! Output types returned by the studio entry points.

use crate::episode::GenerationResult;
use crate::pipeline::generate::TokenUsage;
use serde::Serialize;

/// A finished episode and how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeOutput {
    pub episode_number: u32,
    pub result: GenerationResult,
    pub stats: EpisodeStats,
}

impl EpisodeOutput {
    /// The script text exactly as the model returned it.
    pub fn script(&self) -> &str {
        &self.result.script_text
    }
}

/// Numbers collected during one generate action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeStats {
    /// Generator that wrote the script (e.g. `gemini`).
    pub provider: String,
    /// Pages in the source PDF; 0 for plain-text input.
    pub page_count: usize,
    /// Characters produced by extraction.
    pub extracted_chars: usize,
    /// Characters of source text embedded in the prompt.
    pub embedded_chars: usize,
    /// Whether the truncation limit cut the source.
    pub truncated: bool,
    /// Characters in the final prompt.
    pub prompt_chars: usize,
    /// Token usage, when the provider reports it.
    pub usage: Option<TokenUsage>,
    pub extraction_ms: u64,
    pub generation_ms: u64,
    pub total_ms: u64,
}

/// What [`crate::studio::inspect`] learns about a document without a model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub page_count: usize,
    pub extracted_chars: usize,
    pub truncation_limit: usize,
    /// True when the prompt would embed only the first `truncation_limit` chars.
    pub would_truncate: bool,
}
