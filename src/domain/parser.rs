//! Extraction capability consumed by the importer

use async_trait::async_trait;
use std::fmt::Debug;

use super::document::DocumentContent;
use super::error::ImporterError;
use super::metadata::Metadata;

/// Input handed to a parser
#[derive(Debug, Clone)]
pub struct ParserInput {
    pub reference: String,
    /// Detected content type, without parameters
    pub content_type: String,
    pub content: DocumentContent,
    /// Metadata gathered before extraction
    pub metadata: Metadata,
}

impl ParserInput {
    pub fn new(
        reference: impl Into<String>,
        content_type: impl Into<String>,
        content: DocumentContent,
    ) -> Self {
        Self {
            reference: reference.into(),
            content_type: content_type.into(),
            content,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Content decoded as UTF-8, replacing invalid sequences
    pub async fn text(&self) -> Result<String, ImporterError> {
        self.content.to_text_lossy().await
    }
}

/// Text and metadata extracted from a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub text: String,
    pub metadata: Metadata,
    /// Error raised after metadata was already harvested
    ///
    /// The importer keeps `metadata` and reports the error; `text` is
    /// discarded.
    pub failure: Option<ImporterError>,
}

impl ParsedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
            failure: None,
        }
    }

    pub fn with_failure(mut self, failure: ImporterError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.add(name, value);
        self
    }
}

/// Turns raw content of some content types into text and metadata
///
/// Input that is malformed for the claimed type should be reported as
/// `ImporterError::ContentTypeMismatch` so callers may re-detect and retry.
#[async_trait]
pub trait DocumentParser: Send + Sync + Debug {
    /// Parser name used in logs
    fn name(&self) -> &str;

    /// Whether the parser handles this content type
    fn supports(&self, content_type: &str) -> bool;

    /// Extract text and metadata
    async fn parse(&self, input: &ParserInput) -> Result<ParsedDocument, ImporterError>;
}

/// Whether a content type starts with any of the given prefixes
pub fn matches_any(content_type: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| content_type.starts_with(prefix))
}


#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_mock_parser_queue() {
        let parser = mock::MockDocumentParser::new()
            .with_error(ImporterError::content_type_mismatch("text/html", "bad"))
            .with_result(ParsedDocument::new("fixed").with_field("k", "v"));
        let input = ParserInput::new(
            "doc",
            "text/plain",
            DocumentContent::Memory(Bytes::from("raw")),
        );

        assert!(parser.parse(&input).await.unwrap_err().is_content_type_mismatch());
        assert_eq!(parser.parse(&input).await.unwrap().text, "fixed");
        assert_eq!(parser.parse(&input).await.unwrap().text, "raw");
        assert_eq!(parser.calls(), 3);
    }

    #[test]
    fn test_matches_any() {
        assert!(matches_any("text/html", &["text/"]));
        assert!(!matches_any("application/json", &["text/"]));
    }
}
