//! Error types for the vinapod library.
//!
//! Every failure belongs to exactly one of four categories, each with its own
//! recovery story:
//!
//! * [`ConfigError`] — the operator must fix something (missing API key,
//!   unknown provider, PDF engine not found). Raised once, at startup, when
//!   [`crate::studio::ScriptStudio`] is constructed.
//! * [`InputError`] — the user supplied something unusable (no document,
//!   empty persona name, episode 0). Re-submit with corrected input.
//! * [`ExtractionError`] — the document could not be turned into text.
//!   Supply a different file.
//! * [`GenerationError`] — the model call failed. Retry the action.
//!
//! [`StudioError`] wraps all four so the top-level entry points return a
//! single type, while [`StudioError::kind`] lets callers keep the categories
//! apart when rendering messages.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the vinapod library.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Coarse category of a [`StudioError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Input,
    Extraction,
    Generation,
}

impl StudioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StudioError::Config(_) => ErrorKind::Config,
            StudioError::Input(_) => ErrorKind::Input,
            StudioError::Extraction(_) => ErrorKind::Extraction,
            StudioError::Generation(_) => ErrorKind::Generation,
        }
    }
}

// ── Config errors ────────────────────────────────────────────────────────

/// Fatal until the operator changes the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The selected provider needs an API key and none was supplied.
    #[error("No API key configured for provider '{provider}'.\nSet {env_var} or pass --api-key.")]
    MissingCredential { provider: String, env_var: String },

    /// edgequake-llm could not build the named provider.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// No model was given and the provider has no built-in default.
    #[error("No default model for provider '{provider}'; pass --model.")]
    ModelRequired { provider: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs libpdfium. Either install it system-wide or\n\
set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n"
    )]
    PdfEngineUnavailable(String),
}

// ── Input errors ─────────────────────────────────────────────────────────

/// Recoverable: the user re-submits with different input.
#[derive(Debug, Error)]
pub enum InputError {
    /// Nothing to work from.
    #[error("No document supplied. Upload a PDF (or .txt) file first.")]
    NoDocument,

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the file failed for another reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// A persona name was empty or whitespace only.
    #[error("The {role} name must not be empty")]
    EmptyName { role: &'static str },

    /// Episode numbers start at 1.
    #[error("Episode number must be at least 1, got {0}")]
    InvalidEpisodeNumber(u32),

    /// A series plan file could not be parsed.
    #[error("Invalid series plan '{path}': {detail}\nUse the JSON written by --plan-series --json.")]
    InvalidPlan { path: PathBuf, detail: String },

    /// The requested episode id is not in the series plan.
    #[error("Episode {id} is not in the series plan (available: {available})")]
    EpisodeNotInPlan { id: u32, available: String },

    /// Temperament text did not match any known temperament.
    #[error("Unknown temperament '{0}'. Expected one of: gentle, inquisitive, contrarian, evasive")]
    UnknownTemperament(String),
}

// ── Extraction errors ────────────────────────────────────────────────────

/// Recoverable: the user supplies a different document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The bytes do not start with the `%PDF` magic.
    #[error("Document is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// pdfium could not parse the document.
    #[error("PDF is corrupt or uses an unsupported feature: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// pdfium failed on a specific page.
    #[error("Text extraction failed on page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// The blocking extraction task died.
    #[error("Extraction task failed: {0}")]
    TaskFailed(String),
}

// ── Generation errors ────────────────────────────────────────────────────

/// Recoverable: the user retries the action.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The provider rejected the credential (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// HTTP 429 or an exhausted quota.
    #[error("Quota or rate limit exceeded for provider '{provider}': {detail}")]
    QuotaExceeded { provider: String, detail: String },

    /// Connection-level failure.
    #[error("Network error talking to '{provider}': {detail}")]
    Network { provider: String, detail: String },

    /// The provider answered with an error payload.
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// The model refused or filtered the prompt.
    #[error("Generation blocked by provider: {reason}")]
    Blocked { reason: String },

    /// The response contained no text.
    #[error("Provider '{provider}' returned an empty response")]
    EmptyResponse { provider: String },

    /// The response could not be interpreted.
    #[error("Malformed response from provider: {detail}")]
    MalformedResponse { detail: String },

    /// The call exceeded `api_timeout_secs`.
    #[error("Generation timed out after {secs}s\nIncrease --api-timeout or try again.")]
    Timeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_env_var() {
        let e = ConfigError::MissingCredential {
            provider: "gemini".into(),
            env_var: "GEMINI_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"), "got: {msg}");
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn kind_follows_category() {
        let e: StudioError = InputError::NoDocument.into();
        assert_eq!(e.kind(), ErrorKind::Input);

        let e: StudioError = ExtractionError::PasswordRequired.into();
        assert_eq!(e.kind(), ErrorKind::Extraction);

        let e: StudioError = GenerationError::Timeout { secs: 5 }.into();
        assert_eq!(e.kind(), ErrorKind::Generation);

        let e: StudioError = ConfigError::Invalid("x".into()).into();
        assert_eq!(e.kind(), ErrorKind::Config);
    }

    #[test]
    fn transparent_display() {
        let e: StudioError = GenerationError::EmptyResponse {
            provider: "gemini".into(),
        }
        .into();
        assert_eq!(e.to_string(), "Provider 'gemini' returned an empty response");
    }

    #[test]
    fn timeout_display() {
        let e = GenerationError::Timeout { secs: 180 };
        assert!(e.to_string().contains("180s"));
    }

    #[test]
    fn plan_errors_are_input_errors() {
        let e: StudioError = InputError::EpisodeNotInPlan {
            id: 7,
            available: "1, 2, 3".into(),
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::Input);
        assert!(e.to_string().contains("available: 1, 2, 3"));
    }

    #[test]
    fn episode_number_display() {
        assert!(InputError::InvalidEpisodeNumber(0).to_string().contains("got 0"));
    }
}
