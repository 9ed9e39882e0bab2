//! Series planning: ask the model to split a document into episodes, then
//! script one planned episode as timed, attributed lines.
//!
//! The model is told to answer with bare JSON, but models routinely wrap it
//! in a ```` ```json ```` fence anyway, so the fence is stripped before parsing.

use crate::error::{GenerationError, InputError};
use crate::pipeline::input;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A proposed podcast series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPlan {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub episodes: Vec<EpisodeOutline>,
}

impl SeriesPlan {
    /// The outline with the given id.
    pub fn episode(&self, id: u32) -> Option<&EpisodeOutline> {
        self.episodes.iter().find(|e| e.id == id)
    }

    /// Comma-separated ids, for error messages.
    pub fn episode_ids(&self) -> String {
        self.episodes
            .iter()
            .map(|e| e.id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One planned episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeOutline {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(
        default,
        rename = "durationEstimate",
        alias = "duration_estimate"
    )]
    pub duration_estimate: String,
}

/// One line of a planned episode's script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLine {
    /// Estimated timestamp, e.g. `"00:15"`.
    #[serde(default)]
    pub time: String,
    pub speaker: String,
    pub text: String,
    /// Delivery cue, e.g. `"Suy tư"`.
    #[serde(default)]
    pub emotion: String,
}

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*\n(.*?)\n?```\s*$").unwrap());

/// Remove a single surrounding code fence, if present.
pub fn strip_json_fence(text: &str) -> &str {
    match RE_JSON_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Parse the model's answer into a [`SeriesPlan`].
pub fn parse_series_plan(text: &str) -> Result<SeriesPlan, GenerationError> {
    let body = strip_json_fence(text);
    let plan: SeriesPlan =
        serde_json::from_str(body).map_err(|e| GenerationError::MalformedResponse {
            detail: format!("series plan is not valid JSON: {e}"),
        })?;
    if plan.episodes.is_empty() {
        return Err(GenerationError::MalformedResponse {
            detail: "series plan lists no episodes".into(),
        });
    }
    Ok(plan)
}

/// Load a plan previously written with `--plan-series --json`.
pub async fn load_series_plan(path: &Path) -> Result<SeriesPlan, InputError> {
    let text = input::read_text_file(path).await?;
    let plan: SeriesPlan =
        serde_json::from_str(strip_json_fence(&text)).map_err(|e| InputError::InvalidPlan {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    if plan.episodes.is_empty() {
        return Err(InputError::InvalidPlan {
            path: path.to_path_buf(),
            detail: "no episodes".into(),
        });
    }
    Ok(plan)
}

/// Parse the model's answer into script lines.
///
/// An empty array, or a line with no speaker or no text, is malformed.
pub fn parse_script_lines(text: &str) -> Result<Vec<ScriptLine>, GenerationError> {
    let body = strip_json_fence(text);
    let lines: Vec<ScriptLine> =
        serde_json::from_str(body).map_err(|e| GenerationError::MalformedResponse {
            detail: format!("script is not a JSON array of lines: {e}"),
        })?;
    if lines.is_empty() {
        return Err(GenerationError::MalformedResponse {
            detail: "script has no lines".into(),
        });
    }
    if let Some(pos) = lines
        .iter()
        .position(|l| l.speaker.trim().is_empty() || l.text.trim().is_empty())
    {
        return Err(GenerationError::MalformedResponse {
            detail: format!("script line {} has no speaker or no text", pos + 1),
        });
    }
    Ok(lines)
}

/// Plain-text rendering: `[time] Speaker (emotion): text`, one per line.
pub fn render_script_lines(lines: &[ScriptLine]) -> String {
    let mut out = String::new();
    for line in lines {
        if !line.time.is_empty() {
            out.push_str(&format!("[{}] ", line.time));
        }
        out.push_str(&line.speaker);
        if !line.emotion.is_empty() {
            out.push_str(&format!(" ({})", line.emotion));
        }
        out.push_str(": ");
        out.push_str(&line.text);
        out.push('\n');
    }
    out
}
