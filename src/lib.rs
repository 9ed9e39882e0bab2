//! # vinapod
//!
//! Write Vietnamese two-person podcast scripts from PDF documents.
//!
//! A source document is reduced to plain text, embedded (truncated) into a
//! prompt that casts two personas, and sent to an LLM in a single request.
//! The episode number and a pasted "log" of the previous episode's ending let
//! a series stay continuous without the tool keeping any state itself.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / .txt / URL
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   page text via pdfium (spawn_blocking), concatenated
//!  ├─ 3. Prompt    role, roster, requirements, previous log, source
//!  ├─ 4. Generate  one call to Gemini or any edgequake-llm provider
//!  └─ 5. Output    the script, untouched, plus stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vinapod::{PersonaConfig, ScriptStudio, StudioConfig, Temperament};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StudioConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let studio = ScriptStudio::new(config)?;
//!     let persona = PersonaConfig::new("Minh", "An", Temperament::Contrarian)?;
//!     let output = studio
//!         .generate_episode_from("brief.pdf", persona, 1, "")
//!         .await?;
//!     println!("{}", output.script());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `vinapod` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod episode;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod series;
pub mod studio;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{StudioConfig, StudioConfigBuilder};
pub use episode::{EpisodeRequest, GenerationResult, PersonaConfig, Temperament};
pub use error::{
    ConfigError, ErrorKind, ExtractionError, GenerationError, InputError, StudioError,
};
pub use output::{DocumentReport, EpisodeOutput, EpisodeStats};
pub use pipeline::extract::{extract, ExtractedDocument, PdfEngine};
pub use pipeline::gemini::GeminiGenerator;
pub use pipeline::generate::{Generated, ScriptGenerator, TokenUsage};
pub use pipeline::input::{read_text_file, resolve_input, DocumentSource};
pub use progress::{EpisodeStage, NoopStageCallback, ProgressCallback, StageCallback};
pub use prompts::{render_episode_prompt, DirectiveTable};
pub use series::{load_series_plan, parse_script_lines, render_script_lines, EpisodeOutline, ScriptLine, SeriesPlan};
pub use studio::{generate_episode_sync, inspect, preview_episode_prompt, ScriptStudio};
