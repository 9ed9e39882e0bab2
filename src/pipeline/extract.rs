//! Text extraction: PDF bytes → one plain-text string, via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium-render wraps the pdfium C++ library, which keeps thread-local state
//! and blocks. Running it on tokio's blocking pool keeps the async workers
//! free while a large document is being parsed.
//!
//! ## Concatenation
//!
//! Page texts are appended in ascending page order with nothing inserted in
//! between; whatever line breaks pdfium reports inside a page are kept.

use crate::error::{ConfigError, ExtractionError, StudioError};
use crate::pipeline::input::DocumentSource;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Text pulled out of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    /// Concatenated page text.
    pub text: String,
    /// Number of pages (0 for plain-text input).
    pub page_count: usize,
}

impl ExtractedDocument {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Locates and binds libpdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfEngine {
    library: Option<PathBuf>,
}

impl PdfEngine {
    /// Use the library at `path`, or the system library when `None`.
    pub fn new(library: Option<PathBuf>) -> Self {
        Self { library }
    }

    /// Bind to pdfium. Cheap enough to call once per extraction.
    pub fn bind(&self) -> Result<Pdfium, ConfigError> {
        let bindings = match self.library {
            Some(ref path) => bind_from_path(path)?,
            None => Pdfium::bind_to_system_library()
                .map_err(|e| ConfigError::PdfEngineUnavailable(format!("system library: {e}")))?,
        };
        Ok(Pdfium::new(bindings))
    }
}

fn bind_from_path(path: &Path) -> Result<Box<dyn PdfiumLibraryBindings>, ConfigError> {
    Pdfium::bind_to_library(path)
        .map_err(|e| ConfigError::PdfEngineUnavailable(format!("'{}': {e}", path.display())))
}

/// Extract text from any supported document.
///
/// Plain text passes straight through; PDFs go through pdfium.
pub async fn extract_document(
    source: DocumentSource,
    engine: &PdfEngine,
    password: Option<&str>,
) -> Result<ExtractedDocument, StudioError> {
    match source {
        DocumentSource::PlainText(text) => Ok(ExtractedDocument {
            text,
            page_count: 0,
        }),
        DocumentSource::Pdf(bytes) => extract_pdf(bytes, engine, password).await,
    }
}

/// Extract text from PDF bytes.
///
/// The buffer is moved into the blocking task and dropped when it finishes.
pub async fn extract_pdf(
    bytes: Vec<u8>,
    engine: &PdfEngine,
    password: Option<&str>,
) -> Result<ExtractedDocument, StudioError> {
    check_magic(&bytes)?;

    let engine = engine.clone();
    let password = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        let pdfium = engine.bind()?;
        extract_pdf_blocking(&pdfium, &bytes, password.as_deref()).map_err(StudioError::from)
    })
    .await
    .map_err(|e| ExtractionError::TaskFailed(format!("extraction task panicked: {e}")))?
}

/// The `extract(bytes) -> text` contract in its plainest form.
pub async fn extract(bytes: Vec<u8>, engine: &PdfEngine) -> Result<String, StudioError> {
    Ok(extract_pdf(bytes, engine, None).await?.text)
}

/// Reject byte streams that cannot be a PDF before pdfium sees them.
pub fn check_magic(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(ExtractionError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Blocking implementation of text extraction.
fn extract_pdf_blocking(
    pdfium: &Pdfium,
    bytes: &[u8],
    password: Option<&str>,
) -> Result<ExtractedDocument, ExtractionError> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| classify_load_error(&format!("{:?}", e), password.is_some()))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let mut text = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let page_text = page.text().map_err(|e| ExtractionError::PageFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        })?;
        let chunk = page_text.all();
        debug!("Page {}: {} chars", idx + 1, chunk.chars().count());
        text.push_str(&chunk);
    }

    Ok(ExtractedDocument { text, page_count })
}

/// Map a pdfium load failure onto the extraction taxonomy.
fn classify_load_error(detail: &str, had_password: bool) -> ExtractionError {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            ExtractionError::WrongPassword
        } else {
            ExtractionError::PasswordRequired
        }
    } else {
        ExtractionError::CorruptPdf {
            detail: detail.to_string(),
        }
    }
}
