//! Plain text parser

use async_trait::async_trait;

use crate::domain::parser::{matches_any, DocumentParser, ParsedDocument, ParserInput};
use crate::domain::ImporterError;

/// Passes text through, decoding UTF-8 lossily
#[derive(Debug, Clone, Default)]
pub struct PlainTextParser;

impl PlainTextParser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentParser for PlainTextParser {
    fn name(&self) -> &str {
        "plain_text"
    }

    fn supports(&self, content_type: &str) -> bool {
        matches_any(content_type, &["text/plain"])
    }

    async fn parse(&self, input: &ParserInput) -> Result<ParsedDocument, ImporterError> {
        let text = input.text().await?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text).to_string();
        Ok(ParsedDocument::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DocumentContent;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_parse_text() {
        let input = ParserInput::new(
            "a.txt",
            "text/plain",
            DocumentContent::Memory(Bytes::from("\u{feff}Hello, World!")),
        );

        let result = PlainTextParser::new().parse(&input).await.unwrap();
        assert_eq!(result.text, "Hello, World!");
        assert!(result.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let input = ParserInput::new(
            "a.txt",
            "text/plain",
            DocumentContent::Memory(Bytes::from_static(&[b'o', b'k', 0xff])),
        );

        let result = PlainTextParser::new().parse(&input).await.unwrap();
        assert_eq!(result.text, "ok\u{fffd}");
    }
}
