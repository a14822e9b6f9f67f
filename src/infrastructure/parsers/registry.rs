//! Parser lookup by content type

use std::sync::Arc;

use tracing::debug;

use super::{ExternalParser, ExternalParserConfig, HtmlParser, JsonParser, MarkdownParser, PlainTextParser};
use crate::domain::document::ContentFactory;
use crate::domain::parser::DocumentParser;

/// Ordered set of parsers; external parsers are consulted first
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    external: Vec<Arc<dyn DocumentParser>>,
    builtin: Vec<Arc<dyn DocumentParser>>,
    fallback: Arc<dyn DocumentParser>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// Registry with the built-in parsers
    pub fn new() -> Self {
        Self {
            external: Vec::new(),
            builtin: vec![
                Arc::new(PlainTextParser::new()),
                Arc::new(HtmlParser::new()),
                Arc::new(MarkdownParser::new()),
                Arc::new(JsonParser::new()),
            ],
            fallback: Arc::new(PlainTextParser::new()),
        }
    }

    /// Registry with built-ins plus configured external parsers
    pub fn with_external(configs: &[ExternalParserConfig], factory: &ContentFactory) -> Self {
        let mut registry = Self::new();
        for config in configs {
            registry
                .external
                .push(Arc::new(ExternalParser::new(config.clone(), factory.clone())));
        }
        registry
    }

    /// Add a parser taking precedence over every parser registered so far
    pub fn register(&mut self, parser: Arc<dyn DocumentParser>) {
        self.external.insert(0, parser);
    }

    /// Find the parser for a content type
    ///
    /// Unclaimed `text/*` types fall back to plain text.
    pub fn resolve(&self, content_type: &str) -> Option<Arc<dyn DocumentParser>> {
        let found = self
            .external
            .iter()
            .chain(self.builtin.iter())
            .find(|p| p.supports(content_type))
            .cloned();

        match found {
            Some(parser) => Some(parser),
            None if content_type.starts_with("text/") => {
                debug!(content_type, "Falling back to plain text parser");
                Some(self.fallback.clone())
            }
            None => None,
        }
    }
}
