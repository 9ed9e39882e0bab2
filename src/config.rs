//! Configuration for the script studio.
//!
//! All behaviour is controlled through [`StudioConfig`], built via
//! [`StudioConfigBuilder`]. The credential travels inside the config: the
//! library never reads the environment itself, so the caller decides where
//! keys come from (CLI flag, env var, secret store).

use crate::error::ConfigError;
use crate::episode::Temperament;
use crate::pipeline::generate::ScriptGenerator;
use crate::progress::ProgressCallback;
use crate::prompts::{DirectiveTable, DEFAULT_TRUNCATION_LIMIT};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Provider served by the built-in Gemini REST client.
pub const GEMINI_PROVIDER: &str = "gemini";

/// Model used when the Gemini provider is selected without `--model`.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Model used when the OpenAI provider is selected without `--model`.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano";

/// Configuration for episode generation.
///
/// # Example
/// ```rust
/// use vinapod::StudioConfig;
///
/// let config = StudioConfig::builder()
///     .api_key("test-key")
///     .truncation_limit(8_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.truncation_limit, 8_000);
/// ```
#[derive(Clone)]
pub struct StudioConfig {
    /// Maximum number of source characters embedded in a prompt. Default: 10 000.
    ///
    /// Counted in characters, not bytes or tokens.
    pub truncation_limit: usize,

    /// Provider name. Default: `"gemini"`.
    ///
    /// `gemini` is served by the built-in REST client and needs `api_key`.
    /// Any other name (openai, anthropic, ollama, …) is handed to
    /// `edgequake_llm::ProviderFactory`, which reads its own key variable.
    pub provider_name: String,

    /// Model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// API key for the Gemini provider.
    pub api_key: Option<String>,

    /// Pre-constructed generator. Takes precedence over `provider_name`.
    pub generator: Option<Arc<dyn ScriptGenerator>>,

    /// Sampling temperature. Default: 0.8.
    pub temperature: f32,

    /// Maximum tokens the model may produce. Default: 8192.
    pub max_tokens: usize,

    /// Timeout for the single generation call, in seconds. Default: 180.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to libpdfium. If None, the system library is used.
    pub pdfium_library: Option<PathBuf>,

    /// Temperament directives inserted into the roster.
    pub directives: DirectiveTable,

    /// Optional stage-event callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            truncation_limit: DEFAULT_TRUNCATION_LIMIT,
            provider_name: GEMINI_PROVIDER.to_string(),
            model: None,
            api_key: None,
            generator: None,
            temperature: 0.8,
            max_tokens: 8192,
            api_timeout_secs: 180,
            download_timeout_secs: 120,
            password: None,
            pdfium_library: None,
            directives: DirectiveTable::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudioConfig")
            .field("truncation_limit", &self.truncation_limit)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("generator", &self.generator.as_ref().map(|_| "<dyn ScriptGenerator>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .finish()
    }
}

impl StudioConfig {
    /// Create a new builder for `StudioConfig`.
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model that will be requested, falling back to the provider default.
    pub fn resolved_model(&self) -> Result<String, ConfigError> {
        if let Some(ref m) = self.model {
            return Ok(m.clone());
        }
        match self.provider_name.as_str() {
            GEMINI_PROVIDER => Ok(DEFAULT_GEMINI_MODEL.to_string()),
            "openai" => Ok(DEFAULT_OPENAI_MODEL.to_string()),
            other => Err(ConfigError::ModelRequired {
                provider: other.to_string(),
            }),
        }
    }
}

/// Builder for [`StudioConfig`].
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl fmt::Debug for StudioConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudioConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl StudioConfigBuilder {
    pub fn truncation_limit(mut self, chars: usize) -> Self {
        self.config.truncation_limit = chars;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into().trim().to_lowercase();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn generator(mut self, generator: Arc<dyn ScriptGenerator>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn directive(mut self, temperament: Temperament, text: impl Into<String>) -> Self {
        self.config.directives.set(temperament, text);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudioConfig, ConfigError> {
        let c = &self.config;
        if c.truncation_limit == 0 {
            return Err(ConfigError::Invalid(
                "Truncation limit must be ≥ 1 character".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ConfigError::Invalid("API timeout must be ≥ 1s".into()));
        }
        if c.provider_name.is_empty() {
            return Err(ConfigError::Invalid("Provider name must not be empty".into()));
        }
        for t in Temperament::ALL {
            if c.directives.get(t).trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Directive for temperament '{t}' must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = StudioConfig::default();
        assert_eq!(c.truncation_limit, 10_000);
        assert_eq!(c.provider_name, "gemini");
        assert_eq!(c.api_timeout_secs, 180);
        assert_eq!(c.resolved_model().unwrap(), "gemini-1.5-flash");
    }

    #[test]
    fn zero_truncation_rejected() {
        let err = StudioConfig::builder().truncation_limit(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn temperature_is_clamped() {
        let c = StudioConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn provider_name_normalised() {
        let c = StudioConfig::builder().provider_name(" OpenAI ").build().unwrap();
        assert_eq!(c.provider_name, "openai");
        assert_eq!(c.resolved_model().unwrap(), "gpt-4.1-nano");
    }

    #[test]
    fn unknown_provider_needs_model() {
        let c = StudioConfig::builder().provider_name("ollama").build().unwrap();
        assert!(matches!(
            c.resolved_model(),
            Err(ConfigError::ModelRequired { .. })
        ));
        let c = StudioConfig::builder()
            .provider_name("ollama")
            .model("llama3.2")
            .build()
            .unwrap();
        assert_eq!(c.resolved_model().unwrap(), "llama3.2");
    }

    #[test]
    fn blank_directive_rejected() {
        let err = StudioConfig::builder()
            .directive(Temperament::Gentle, "  ")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("gentle"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = StudioConfig::builder()
            .api_key("sk-very-secret")
            .password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
