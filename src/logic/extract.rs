use crate::model::DocumentKind;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported document type; upload a PDF, .txt or .md file")]
    UnsupportedType,
    #[error("No readable text found in document")]
    Empty,
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),
    #[error("I/O error during extraction: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub word_count: i64,
}

/// Pulls plain text out of uploaded files.
///
/// PDFs go through poppler's `pdftotext`; text and Markdown are decoded as UTF-8.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    pdftotext_path: String,
}

impl TextExtractor {
    pub fn new(pdftotext_path: impl Into<String>) -> Self {
        Self {
            pdftotext_path: pdftotext_path.into(),
        }
    }

    pub async fn extract(
        &self,
        kind: DocumentKind,
        bytes: &[u8],
    ) -> Result<ExtractedText, ExtractError> {
        let raw = match kind {
            DocumentKind::Text | DocumentKind::Markdown => String::from_utf8_lossy(bytes).into_owned(),
            DocumentKind::Pdf => self.extract_pdf(bytes).await?,
        };

        let text = normalize_text(&raw);
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }
        let word_count = word_count(&text);
        Ok(ExtractedText { text, word_count })
    }

    /// Whether the configured pdftotext binary can be run at all
    pub async fn pdf_supported(&self) -> bool {
        Command::new(&self.pdftotext_path)
            .arg("-v")
            .output()
            .await
            .is_ok()
    }

    async fn extract_pdf(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let staged = tempfile::Builder::new()
            .prefix("studymate-")
            .suffix(".pdf")
            .tempfile()?;
        tokio::fs::write(staged.path(), bytes).await?;

        let output = Command::new(&self.pdftotext_path)
            .arg("-enc")
            .arg("UTF-8")
            .arg(staged.path())
            .arg("-")
            .output()
            .await
            .map_err(|e| ExtractError::Pdf(format!("could not run {}: {}", self.pdftotext_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Pdf(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Tidy extracted text: drop form feeds, trim line ends, collapse blank-line runs to one
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;

    for line in raw.replace('\u{c}', "\n").replace("\r\n", "\n").lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(line);
    }

    out
}

pub fn word_count(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}

/// SHA-256 of the uploaded bytes, hex encoded
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
