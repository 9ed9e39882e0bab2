//! Top-level entry points: one document, one prompt, one model call.
//!
//! [`ScriptStudio`] owns the configuration and a generator resolved once at
//! construction, so a missing credential is reported before any document is
//! touched. Each call to [`ScriptStudio::generate_episode`] is a fresh walk
//! through the stage machine in [`crate::progress`]; nothing is remembered
//! between calls.

use crate::config::{StudioConfig, GEMINI_PROVIDER};
use crate::episode::{EpisodeRequest, GenerationResult, PersonaConfig};
use crate::error::{ConfigError, GenerationError, InputError, StudioError};
use crate::output::{DocumentReport, EpisodeOutput, EpisodeStats};
use crate::pipeline::extract::{self, ExtractedDocument, PdfEngine};
use crate::pipeline::gemini::GeminiGenerator;
use crate::pipeline::generate::{Generated, ProviderGenerator, SamplingOptions, ScriptGenerator};
use crate::pipeline::input::{self, DocumentSource};
use crate::progress::{EpisodeStage, ProgressCallback};
use crate::prompts;
use crate::series::{self, ScriptLine, SeriesPlan};
use edgequake_llm::ProviderFactory;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Environment variable the CLI reads the Gemini key from.
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// A configured script writer.
pub struct ScriptStudio {
    config: StudioConfig,
    generator: Arc<dyn ScriptGenerator>,
    engine: PdfEngine,
}

impl std::fmt::Debug for ScriptStudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptStudio")
            .field("config", &self.config)
            .field("generator", &self.generator.name())
            .finish()
    }
}

impl ScriptStudio {
    /// Resolve the generator and PDF engine for `config`.
    ///
    /// # Errors
    /// [`ConfigError::MissingCredential`] when `gemini` is selected without a
    /// key, [`ConfigError::ProviderNotConfigured`] when edgequake-llm cannot
    /// build the named provider.
    pub fn new(config: StudioConfig) -> Result<Self, StudioError> {
        let generator = resolve_generator(&config)?;
        info!("Script generator: {}", generator.name());
        let engine = PdfEngine::new(config.pdfium_library.clone());
        Ok(Self {
            config,
            generator,
            engine,
        })
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Name of the generator that will write scripts.
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// The exact prompt [`Self::build_and_generate`] would send.
    pub fn preview_prompt(&self, request: &EpisodeRequest) -> String {
        prompts::render_episode_prompt(
            request,
            &self.config.directives,
            self.config.truncation_limit,
        )
    }

    /// Render the prompt for `request` and issue exactly one generation call.
    ///
    /// The returned script is the service's text, unmodified.
    pub async fn build_and_generate(
        &self,
        request: &EpisodeRequest,
    ) -> Result<GenerationResult, StudioError> {
        let prompt = self.preview_prompt(request);
        let generated = self.call_generator(&prompt).await?;
        Ok(GenerationResult {
            script_text: generated.text,
        })
    }

    /// Resolve a path or URL, then run [`Self::generate_episode`].
    pub async fn generate_episode_from(
        &self,
        input_str: &str,
        persona: PersonaConfig,
        episode_number: u32,
        continuity_log: &str,
    ) -> Result<EpisodeOutput, StudioError> {
        let source = input::resolve_input(input_str, self.config.download_timeout_secs).await?;
        self.generate_episode(source, persona, episode_number, continuity_log)
            .await
    }

    /// Run one full generate action: extract, build, call, return.
    ///
    /// Extraction failures stop the action before any request is built, so
    /// the generation service is never called with a partial document.
    pub async fn generate_episode(
        &self,
        source: DocumentSource,
        persona: PersonaConfig,
        episode_number: u32,
        continuity_log: &str,
    ) -> Result<EpisodeOutput, StudioError> {
        let mut tracker = StageTracker::new(self.config.progress_callback.clone());
        let result = self
            .run_episode(&mut tracker, source, persona, episode_number, continuity_log)
            .await;
        tracker.finish(result)
    }

    async fn run_episode(
        &self,
        tracker: &mut StageTracker,
        source: DocumentSource,
        persona: PersonaConfig,
        episode_number: u32,
        continuity_log: &str,
    ) -> Result<EpisodeOutput, StudioError> {
        let total_start = Instant::now();
        if episode_number == 0 {
            return Err(InputError::InvalidEpisodeNumber(episode_number).into());
        }
        if source.is_empty() {
            return Err(InputError::NoDocument.into());
        }
        tracker.advance(EpisodeStage::DocumentProvided);

        // ── Extract ──────────────────────────────────────────────────────
        let extraction_start = Instant::now();
        let document = self.extract(source).await?;
        let extraction_ms = extraction_start.elapsed().as_millis() as u64;
        let extracted_chars = document.char_count();
        info!(
            "Extracted {} chars from {} pages in {}ms",
            extracted_chars, document.page_count, extraction_ms
        );
        warn_if_blank(&document);
        tracker.extracted(document.page_count, extracted_chars);
        tracker.advance(EpisodeStage::Extracted);

        // ── Build ────────────────────────────────────────────────────────
        let page_count = document.page_count;
        let request = EpisodeRequest::new(episode_number, document.text, persona)?
            .with_continuity_log(continuity_log);
        let prompt = self.preview_prompt(&request);
        let embedded_chars = extracted_chars.min(self.config.truncation_limit);
        let truncated = extracted_chars > self.config.truncation_limit;
        if truncated {
            info!(
                "Source truncated to {} of {} chars",
                embedded_chars, extracted_chars
            );
        }
        let prompt_chars = prompt.chars().count();
        debug!("Episode {} prompt: {} chars", episode_number, prompt_chars);
        tracker.advance(EpisodeStage::RequestBuilt);

        // ── Generate ─────────────────────────────────────────────────────
        tracker.advance(EpisodeStage::AwaitingResponse);
        let generation_start = Instant::now();
        let generated = self.call_generator(&prompt).await?;
        let generation_ms = generation_start.elapsed().as_millis() as u64;

        let stats = EpisodeStats {
            provider: self.generator.name().to_string(),
            page_count,
            extracted_chars,
            embedded_chars,
            truncated,
            prompt_chars,
            usage: generated.usage,
            extraction_ms,
            generation_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Episode {} written: {} chars in {}ms",
            episode_number,
            generated.text.chars().count(),
            stats.total_ms
        );

        Ok(EpisodeOutput {
            episode_number,
            result: GenerationResult {
                script_text: generated.text,
            },
            stats,
        })
    }

    /// Ask the model to split the document into a series of episodes.
    pub async fn plan_series(
        &self,
        source: DocumentSource,
        persona: &PersonaConfig,
    ) -> Result<SeriesPlan, StudioError> {
        let mut tracker = StageTracker::new(self.config.progress_callback.clone());
        let result = self.run_series(&mut tracker, source, persona).await;
        tracker.finish(result)
    }

    async fn run_series(
        &self,
        tracker: &mut StageTracker,
        source: DocumentSource,
        persona: &PersonaConfig,
    ) -> Result<SeriesPlan, StudioError> {
        if source.is_empty() {
            return Err(InputError::NoDocument.into());
        }
        tracker.advance(EpisodeStage::DocumentProvided);

        let document = self.extract(source).await?;
        warn_if_blank(&document);
        tracker.extracted(document.page_count, document.char_count());
        tracker.advance(EpisodeStage::Extracted);

        let prompt =
            prompts::render_series_prompt(&document.text, persona, self.config.truncation_limit);
        tracker.advance(EpisodeStage::RequestBuilt);

        tracker.advance(EpisodeStage::AwaitingResponse);
        let generated = self.call_generator(&prompt).await?;
        let plan = series::parse_series_plan(&generated.text)?;
        info!("Series '{}': {} episodes", plan.title, plan.episodes.len());
        Ok(plan)
    }

    /// Script one episode of an existing series plan as timed lines.
    ///
    /// An `episode_id` missing from `plan` is rejected before the document
    /// is read.
    pub async fn write_planned_episode(
        &self,
        source: DocumentSource,
        plan: &SeriesPlan,
        episode_id: u32,
        persona: &PersonaConfig,
    ) -> Result<Vec<ScriptLine>, StudioError> {
        let mut tracker = StageTracker::new(self.config.progress_callback.clone());
        let result = self
            .run_planned(&mut tracker, source, plan, episode_id, persona)
            .await;
        tracker.finish(result)
    }

    async fn run_planned(
        &self,
        tracker: &mut StageTracker,
        source: DocumentSource,
        plan: &SeriesPlan,
        episode_id: u32,
        persona: &PersonaConfig,
    ) -> Result<Vec<ScriptLine>, StudioError> {
        let outline = plan
            .episode(episode_id)
            .ok_or_else(|| InputError::EpisodeNotInPlan {
                id: episode_id,
                available: plan.episode_ids(),
            })?;
        if source.is_empty() {
            return Err(InputError::NoDocument.into());
        }
        tracker.advance(EpisodeStage::DocumentProvided);

        let document = self.extract(source).await?;
        warn_if_blank(&document);
        tracker.extracted(document.page_count, document.char_count());
        tracker.advance(EpisodeStage::Extracted);

        let prompt = prompts::render_outline_prompt(
            &document.text,
            plan,
            outline,
            persona,
            &self.config.directives,
            self.config.truncation_limit,
        );
        tracker.advance(EpisodeStage::RequestBuilt);

        tracker.advance(EpisodeStage::AwaitingResponse);
        let generated = self.call_generator(&prompt).await?;
        let lines = series::parse_script_lines(&generated.text)?;
        info!(
            "Planned episode {} '{}': {} lines",
            outline.id,
            outline.title,
            lines.len()
        );
        Ok(lines)
    }

    async fn extract(&self, source: DocumentSource) -> Result<ExtractedDocument, StudioError> {
        extract::extract_document(source, &self.engine, self.config.password.as_deref()).await
    }

    /// One request, bounded by the configured timeout.
    async fn call_generator(&self, prompt: &str) -> Result<Generated, StudioError> {
        let secs = self.config.api_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), self.generator.generate(prompt)).await
        {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!("{} did not answer within {}s", self.generator.name(), secs);
                Err(GenerationError::Timeout { secs }.into())
            }
        }
    }
}

/// Extract a document and report on it. Needs no credential.
pub async fn inspect(
    source: DocumentSource,
    config: &StudioConfig,
) -> Result<DocumentReport, StudioError> {
    if source.is_empty() {
        return Err(InputError::NoDocument.into());
    }
    let engine = PdfEngine::new(config.pdfium_library.clone());
    let document = extract::extract_document(source, &engine, config.password.as_deref()).await?;
    let extracted_chars = document.char_count();
    Ok(DocumentReport {
        page_count: document.page_count,
        extracted_chars,
        truncation_limit: config.truncation_limit,
        would_truncate: extracted_chars > config.truncation_limit,
    })
}

/// Extract a document and render the episode prompt, without a model call.
pub async fn preview_episode_prompt(
    source: DocumentSource,
    persona: PersonaConfig,
    episode_number: u32,
    continuity_log: &str,
    config: &StudioConfig,
) -> Result<String, StudioError> {
    if source.is_empty() {
        return Err(InputError::NoDocument.into());
    }
    let engine = PdfEngine::new(config.pdfium_library.clone());
    let document = extract::extract_document(source, &engine, config.password.as_deref()).await?;
    let request = EpisodeRequest::new(episode_number, document.text, persona)?
        .with_continuity_log(continuity_log);
    Ok(prompts::render_episode_prompt(
        &request,
        &config.directives,
        config.truncation_limit,
    ))
}

/// Synchronous wrapper around [`ScriptStudio::generate_episode`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn generate_episode_sync(
    studio: &ScriptStudio,
    source: DocumentSource,
    persona: PersonaConfig,
    episode_number: u32,
    continuity_log: &str,
) -> Result<EpisodeOutput, StudioError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConfigError::Invalid(format!("Failed to create tokio runtime: {e}")))?
        .block_on(studio.generate_episode(source, persona, episode_number, continuity_log))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Pick the generator, from most-specific to least-specific.
///
/// 1. A pre-built generator in the config is used as-is (tests, custom
///    middleware).
/// 2. `gemini` gets the native REST client with the configured key.
/// 3. Any other name goes through [`ProviderFactory::create_llm_provider`],
///    which reads that provider's key from its usual environment variable.
fn resolve_generator(config: &StudioConfig) -> Result<Arc<dyn ScriptGenerator>, ConfigError> {
    if let Some(ref generator) = config.generator {
        return Ok(Arc::clone(generator));
    }

    let sampling = SamplingOptions {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let model = config.resolved_model()?;

    if config.provider_name == GEMINI_PROVIDER {
        let key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                provider: GEMINI_PROVIDER.to_string(),
                env_var: GEMINI_KEY_ENV.to_string(),
            })?;
        return Ok(Arc::new(GeminiGenerator::new(key, model, sampling)));
    }

    let provider = ProviderFactory::create_llm_provider(&config.provider_name, &model).map_err(
        |e| ConfigError::ProviderNotConfigured {
            provider: config.provider_name.clone(),
            hint: format!("{e}"),
        },
    )?;
    Ok(Arc::new(ProviderGenerator::new(
        provider,
        config.provider_name.clone(),
        sampling,
    )))
}

/// Image-only PDFs extract to nothing; the model then writes from the
/// prompt alone.
fn warn_if_blank(document: &ExtractedDocument) {
    if document.text.trim().is_empty() {
        warn!(
            "Extracted text is empty ({} pages); the document may be scanned images. \
             The script will not be grounded in the source.",
            document.page_count
        );
    }
}

/// Follows the active stage so a failure can be reported against it.
struct StageTracker {
    callback: Option<ProgressCallback>,
    current: EpisodeStage,
}

impl StageTracker {
    fn new(callback: Option<ProgressCallback>) -> Self {
        let tracker = Self {
            callback,
            current: EpisodeStage::Idle,
        };
        tracker.emit(EpisodeStage::Idle);
        tracker
    }

    fn emit(&self, stage: EpisodeStage) {
        if let Some(ref cb) = self.callback {
            cb.on_stage(stage);
        }
    }

    fn advance(&mut self, stage: EpisodeStage) {
        debug!("stage: {} → {}", self.current, stage);
        self.current = stage;
        self.emit(stage);
    }

    fn extracted(&self, page_count: usize, chars: usize) {
        if let Some(ref cb) = self.callback {
            cb.on_extracted(page_count, chars);
        }
    }

    fn finish<T>(mut self, result: Result<T, StudioError>) -> Result<T, StudioError> {
        match result {
            Ok(value) => {
                self.advance(EpisodeStage::Completed);
                Ok(value)
            }
            Err(e) => {
                warn!("Failed during '{}': {}", self.current, e);
                if let Some(ref cb) = self.callback {
                    cb.on_failure(self.current, &e.to_string());
                }
                self.advance(EpisodeStage::Failed);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::Temperament;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ScriptGenerator for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<Generated, GenerationError> {
            Ok(Generated::from_text(format!("len={}", prompt.chars().count())))
        }
    }

    fn persona() -> PersonaConfig {
        PersonaConfig::new("Minh", "An", Temperament::Gentle).unwrap()
    }

    #[test]
    fn gemini_without_key_is_missing_credential() {
        let config = StudioConfig::builder().build().unwrap();
        match ScriptStudio::new(config).unwrap_err() {
            StudioError::Config(ConfigError::MissingCredential { env_var, .. }) => {
                assert_eq!(env_var, "GEMINI_API_KEY")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn blank_key_is_missing_credential() {
        let config = StudioConfig::builder().api_key("   ").build().unwrap();
        assert!(matches!(
            ScriptStudio::new(config),
            Err(StudioError::Config(ConfigError::MissingCredential { .. }))
        ));
    }

    #[test]
    fn gemini_with_key_builds() {
        let config = StudioConfig::builder().api_key("k").build().unwrap();
        let studio = ScriptStudio::new(config).unwrap();
        assert_eq!(studio.generator_name(), "gemini");
        assert!(!format!("{studio:?}").contains("\"k\""));
    }

    #[test]
    fn prebuilt_generator_wins() {
        let config = StudioConfig::builder()
            .generator(Arc::new(Echo))
            .build()
            .unwrap();
        assert_eq!(ScriptStudio::new(config).unwrap().generator_name(), "echo");
    }

    #[tokio::test]
    async fn plain_text_episode_reports_stats() {
        let config = StudioConfig::builder()
            .generator(Arc::new(Echo))
            .truncation_limit(5)
            .build()
            .unwrap();
        let studio = ScriptStudio::new(config).unwrap();
        let out = studio
            .generate_episode(DocumentSource::PlainText("abcdefgh".into()), persona(), 1, "")
            .await
            .unwrap();
        assert_eq!(out.stats.extracted_chars, 8);
        assert_eq!(out.stats.embedded_chars, 5);
        assert!(out.stats.truncated);
        assert_eq!(out.stats.provider, "echo");
        assert_eq!(out.script(), format!("len={}", out.stats.prompt_chars));
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn blank_source_logs_warning() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let config = StudioConfig::builder()
            .generator(Arc::new(Echo))
            .build()
            .unwrap();
        let studio = ScriptStudio::new(config).unwrap();
        let out = studio
            .generate_episode(DocumentSource::PlainText(" \n\t ".into()), persona(), 1, "")
            .await
            .unwrap();

        assert_eq!(out.stats.extracted_chars, 3);
        assert!(
            logs.contents().contains("Extracted text is empty"),
            "missing warning in {:?}",
            logs.contents()
        );
    }

    #[tokio::test]
    async fn inspect_needs_no_generator() {
        let config = StudioConfig::builder().truncation_limit(3).build().unwrap();
        let report = inspect(DocumentSource::PlainText("xin chào".into()), &config)
            .await
            .unwrap();
        assert_eq!(report.extracted_chars, 8);
        assert!(report.would_truncate);
        assert_eq!(report.page_count, 0);
    }
}
