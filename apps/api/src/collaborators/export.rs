//! Document export: report text in, bytes out.

use std::str::FromStr;

use bytes::Bytes;

use crate::collaborators::CollaboratorError;

/// A finished export ready to be served as a download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocument {
    pub content_type: &'static str,
    pub extension: &'static str,
    pub bytes: Bytes,
}

pub trait Exporter: Send + Sync {
    fn export(&self, text: &str) -> Result<ExportedDocument, CollaboratorError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Markdown,
    Text,
}

impl FromStr for ExportFormat {
    type Err = CollaboratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "text" | "txt" | "plain" => Ok(ExportFormat::Text),
            other => Err(CollaboratorError::UnknownFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn exporter(self) -> Utf8Exporter {
        match self {
            ExportFormat::Markdown => Utf8Exporter {
                content_type: "text/markdown; charset=utf-8",
                extension: "md",
            },
            ExportFormat::Text => Utf8Exporter {
                content_type: "text/plain; charset=utf-8",
                extension: "txt",
            },
        }
    }
}

/// Writes text verbatim as UTF-8 under a fixed content type.
pub struct Utf8Exporter {
    content_type: &'static str,
    extension: &'static str,
}

impl Exporter for Utf8Exporter {
    fn export(&self, text: &str) -> Result<ExportedDocument, CollaboratorError> {
        Ok(ExportedDocument {
            content_type: self.content_type,
            extension: self.extension,
            bytes: Bytes::copy_from_slice(text.as_bytes()),
        })
    }
}
