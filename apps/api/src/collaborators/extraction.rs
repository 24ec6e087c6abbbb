//! Text extraction from an uploaded reference document.

use bytes::Bytes;

use crate::collaborators::CollaboratorError;

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Turns a document into plain text for the generation prompt.
pub trait ContextExtractor: Send + Sync {
    fn extract(&self, document: &UploadedDocument) -> Result<String, CollaboratorError>;
}

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "json", "csv"];
const TEXT_CONTENT_TYPES: &[&str] = &["application/json", "application/x-ndjson"];

/// Accepts text-like documents only. Binary formats (PDF, DOCX) need their own extractor.
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    fn is_text_like(document: &UploadedDocument) -> bool {
        let by_type = document.content_type.as_deref().map(|ct| {
            let essence = ct.split(';').next().unwrap_or(ct).trim().to_lowercase();
            essence.starts_with("text/") || TEXT_CONTENT_TYPES.contains(&essence.as_str())
        });

        let by_extension = document
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()));

        // A generic binary content type still passes on a text extension.
        by_type == Some(true) || by_extension == Some(true)
    }
}

impl ContextExtractor for PlainTextExtractor {
    fn extract(&self, document: &UploadedDocument) -> Result<String, CollaboratorError> {
        let label = document
            .file_name
            .clone()
            .unwrap_or_else(|| "upload".to_string());

        if !Self::is_text_like(document) {
            return Err(CollaboratorError::Unsupported(format!(
                "{label} ({})",
                document.content_type.as_deref().unwrap_or("unknown type")
            )));
        }

        let text = std::str::from_utf8(&document.bytes)
            .map_err(|e| CollaboratorError::Corrupt(format!("{label} is not valid UTF-8: {e}")))?;

        Ok(text.trim_start_matches('\u{feff}').trim().to_string())
    }
}
