//! Input resolution: turn a user-supplied path or URL into document bytes.
//!
//! Documents are held in memory; pdfium can parse straight from a byte
//! slice, so no temporary file is needed. A `.txt` document skips PDF
//! extraction entirely. Everything else is treated as a PDF and checked for
//! the `%PDF` magic before the engine is touched.

use crate::error::InputError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A document ready for the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Raw PDF bytes.
    Pdf(Vec<u8>),
    /// Already plain text.
    PlainText(String),
}

impl DocumentSource {
    /// Classify uploaded bytes by file name: `.txt` is text, anything else a PDF.
    pub fn from_upload(file_name: &str, bytes: Vec<u8>) -> Self {
        if is_text_name(file_name) {
            DocumentSource::PlainText(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            DocumentSource::Pdf(bytes)
        }
    }

    /// Size of the document in bytes.
    pub fn len(&self) -> usize {
        match self {
            DocumentSource::Pdf(b) => b.len(),
            DocumentSource::PlainText(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn is_text_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

/// Resolve the input string to an in-memory document.
///
/// If the input is a URL, download it. If it is a local file, read it.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<DocumentSource, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(InputError::NoDocument);
    }
    let doc = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    if doc.is_empty() {
        return Err(InputError::NoDocument);
    }
    Ok(doc)
}

/// Read a local file, mapping I/O failures to input errors.
async fn read_local(path_str: &str) -> Result<DocumentSource, InputError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| read_error(&path, e))?;

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    Ok(DocumentSource::from_upload(path_str, bytes))
}

/// Read a UTF-8 side file (continuity log, series plan) with the same
/// error mapping as documents.
pub async fn read_text_file(path: &Path) -> Result<String, InputError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| read_error(path, e))?;
    debug!("Read {} ({} bytes)", path.display(), text.len());
    Ok(text)
}

fn read_error(path: &Path, e: std::io::Error) -> InputError {
    let path = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => InputError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => InputError::PermissionDenied { path },
        _ => InputError::ReadFailed { path, source: e },
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<DocumentSource, InputError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InputError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            InputError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            InputError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(InputError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| InputError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(DocumentSource::from_upload(&url_file_name(url), bytes.to_vec()))
}

/// Last path segment of a URL, used only to classify the document.
fn url_file_name(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded.pdf".to_string()
}
