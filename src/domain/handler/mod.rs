//! Condition-gated handlers
//!
//! Every handler shares the same envelope: an optional name, a set of
//! restrict-to conditions and a kind-specific payload. A handler whose
//! conditions do not match the document has no observable effect.

pub mod filter;
pub mod splitter;
pub mod tagger;
pub mod transformer;

pub use filter::{FilterHandler, OnMatch, RegexMetadataFilter, RegexReferenceFilter};
pub use splitter::{ChunkSplitter, ChunkStrategy, SplitterHandler};
pub use tagger::{ConstantTagger, CopyTagger, OnConflict, TaggerHandler, TextPatternTagger};
pub use transformer::{ReplaceTransformer, Replacement, TransformerHandler};

use serde::{Deserialize, Serialize};

use super::condition::{RestrictTo, RestrictToSet};
use super::document::Document;
use super::error::ImporterError;
use super::metadata::Metadata;

/// Kind-specific handler payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerKind {
    Filter(FilterHandler),
    Tagger(TaggerHandler),
    Transformer(TransformerHandler),
    Splitter(SplitterHandler),
}

impl HandlerKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Filter(_) => "filter",
            Self::Tagger(_) => "tagger",
            Self::Transformer(_) => "transformer",
            Self::Splitter(_) => "splitter",
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Filter(h) => h.type_name(),
            Self::Tagger(h) => h.type_name(),
            Self::Transformer(h) => h.type_name(),
            Self::Splitter(h) => h.type_name(),
        }
    }
}

impl From<FilterHandler> for HandlerKind {
    fn from(handler: FilterHandler) -> Self {
        Self::Filter(handler)
    }
}

impl From<TaggerHandler> for HandlerKind {
    fn from(handler: TaggerHandler) -> Self {
        Self::Tagger(handler)
    }
}

impl From<TransformerHandler> for HandlerKind {
    fn from(handler: TransformerHandler) -> Self {
        Self::Transformer(handler)
    }
}

impl From<SplitterHandler> for HandlerKind {
    fn from(handler: SplitterHandler) -> Self {
        Self::Splitter(handler)
    }
}

/// A configured unit of work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Handler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "RestrictToSet::is_empty")]
    pub restrict_to: RestrictToSet,

    #[serde(flatten)]
    pub kind: HandlerKind,
}

impl Handler {
    pub fn new(kind: impl Into<HandlerKind>) -> Self {
        Self {
            name: None,
            restrict_to: RestrictToSet::new(),
            kind: kind.into(),
        }
    }

    pub fn filter(filter: impl Into<FilterHandler>) -> Self {
        Self::new(filter.into())
    }

    pub fn tagger(tagger: impl Into<TaggerHandler>) -> Self {
        Self::new(tagger.into())
    }

    pub fn transformer(transformer: impl Into<TransformerHandler>) -> Self {
        Self::new(transformer.into())
    }

    pub fn splitter(splitter: impl Into<SplitterHandler>) -> Self {
        Self::new(splitter.into())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn restrict_to(mut self, condition: RestrictTo) -> Self {
        self.restrict_to.push(condition);
        self
    }

    /// Name used in logs and errors
    pub fn label(&self) -> String {
        match self.name {
            Some(ref name) => name.clone(),
            None => format!("{}:{}", self.kind.kind_name(), self.kind.type_name()),
        }
    }

    /// Whether the handler's conditions admit the document
    pub fn should_apply(&self, reference: &str, metadata: &Metadata) -> Result<bool, ImporterError> {
        self.restrict_to.matches(reference, metadata)
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        let wrap = |e: ImporterError| match e {
            ImporterError::Configuration { message } => ImporterError::configuration(format!(
                "{}: {}",
                self.label(),
                message
            )),
            other => other,
        };

        self.restrict_to.validate().map_err(wrap)?;

        match &self.kind {
            HandlerKind::Filter(h) => h.validate(),
            HandlerKind::Tagger(h) => h.validate(),
            HandlerKind::Transformer(h) => h.validate(),
            HandlerKind::Splitter(h) => h.validate(),
        }
        .map_err(wrap)
    }
}

/// Result of applying one handler to a document
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Conditions did not match; the document is untouched
    Skipped,
    Accepted,
    Rejected,
    /// Metadata or content was updated in place
    Applied,
    /// Child documents; empty means no split happened
    Split(Vec<Document>),
}

impl HandlerOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let handler = Handler::filter(RegexReferenceFilter::new(".*"));
        assert_eq!(handler.label(), "filter:regex_reference");
        assert_eq!(handler.with_name("only-pdf").label(), "only-pdf");
    }

    #[test]
    fn test_should_apply() {
        let handler = Handler::tagger(ConstantTagger::new("x", ["y"]))
            .restrict_to(RestrictTo::new("lang", "en"));
        let english: Metadata = [("lang", "EN")].into_iter().collect();

        assert!(handler.should_apply("doc", &english).unwrap());
        assert!(!handler.should_apply("doc", &Metadata::new()).unwrap());
    }

    #[test]
    fn test_deserialize_flattened() {
        let handler: Handler = serde_json::from_value(serde_json::json!({
            "name": "potatoes",
            "kind": "filter",
            "type": "regex_metadata",
            "field": "title",
            "regex": ".*potato.*",
            "restrict_to": [{"field": "document.reference", "pattern": ".*\\.html"}]
        }))
        .unwrap();

        assert_eq!(handler.label(), "potatoes");
        assert_eq!(handler.restrict_to.len(), 1);
        assert!(matches!(
            handler.kind,
            HandlerKind::Filter(FilterHandler::RegexMetadata(_))
        ));
    }

    #[test]
    fn test_deserialize_external_tagger() {
        let handler: Handler = serde_json::from_value(serde_json::json!({
            "kind": "tagger",
            "type": "external",
            "command": "tool ${INPUT}",
            "timeout_ms": 500,
            "metadata_extraction_patterns": [
                {"pattern": "^(\\w+)=(.*)", "field": 1, "value": 2}
            ]
        }))
        .unwrap();

        let HandlerKind::Tagger(TaggerHandler::External(config)) = &handler.kind else {
            panic!("expected external tagger");
        };
        assert_eq!(config.timeout_ms, Some(500));
        assert_eq!(config.metadata_extraction_patterns.rules().len(), 1);
    }

    #[test]
    fn test_validate_names_the_handler() {
        let handler = Handler::tagger(ConstantTagger::new("", ["x"])).with_name("broken");
        let err = handler.validate().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_outcome_rejected() {
        assert!(HandlerOutcome::Rejected.is_rejected());
        assert!(!HandlerOutcome::Skipped.is_rejected());
    }
}
