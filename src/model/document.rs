use crate::model::{Id, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
            DocumentKind::Markdown => "markdown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pdf" => Some(DocumentKind::Pdf),
            "text" => Some(DocumentKind::Text),
            "markdown" => Some(DocumentKind::Markdown),
            _ => None,
        }
    }

    /// Work out the kind of an upload.
    ///
    /// The PDF magic number wins over everything else, then the declared
    /// content type, then the file extension.
    pub fn detect(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            return Some(DocumentKind::Pdf);
        }

        if let Some(content_type) = content_type {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            match essence.as_str() {
                "application/pdf" => return Some(DocumentKind::Pdf),
                "text/plain" => return Some(DocumentKind::Text),
                "text/markdown" | "text/x-markdown" => return Some(DocumentKind::Markdown),
                _ => {}
            }
        }

        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())?;
        match extension.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "text" => Some(DocumentKind::Text),
            "md" | "markdown" => Some(DocumentKind::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub file_name: String,
    pub kind: DocumentKind,
    pub size_bytes: i64,
    pub content_hash: String,
    pub extracted_text: String,
    pub word_count: i64,
    pub summary: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// List view of a document, without the extracted text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: Id,
    pub title: String,
    pub file_name: String,
    pub kind: DocumentKind,
    pub size_bytes: i64,
    pub word_count: i64,
    pub has_summary: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Document> for DocumentSummary {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            title: document.title.clone(),
            file_name: document.file_name.clone(),
            kind: document.kind,
            size_bytes: document.size_bytes,
            word_count: document.word_count,
            has_summary: document.summary.is_some(),
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }
}

/// Input model for POST /documents
///
/// Either `data_base64` (a file) or `text` (pasted content) must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data_base64: Option<String>,
    pub text: Option<String>,
}

/// Input model for PATCH /documents/:id
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUpdate {
    pub title: String,
}

/// Derive a display title from a file name: strip the extension and tidy separators
pub fn title_from_file_name(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    let title = stem.replace(['_', '-'], " ");
    let title = title
        .trim_matches('.')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        "Untitled document".to_string()
    } else {
        title
    }
}
