//! Taggers adding or changing metadata

use serde::{Deserialize, Serialize};

use crate::domain::condition::field_values;
use crate::domain::extraction::{FieldExtraction, FieldExtractor};
use crate::domain::metadata::Metadata;
use crate::domain::process::ExternalProcessConfig;
use crate::domain::ImporterError;

/// Behaviour when the target field already has values
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    #[default]
    Append,
    Replace,
    KeepExisting,
}

impl OnConflict {
    fn store(&self, metadata: &mut Metadata, field: &str, values: Vec<String>) {
        match self {
            Self::Append => metadata.add_all(field, values),
            Self::Replace => metadata.set(field, values),
            Self::KeepExisting if metadata.contains(field) => {}
            Self::KeepExisting => metadata.set(field, values),
        }
    }
}

/// Adds fixed values to a field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstantTagger {
    pub field: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub on_conflict: OnConflict,
}

impl ConstantTagger {
    pub fn new<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            on_conflict: OnConflict::Append,
        }
    }

    pub fn with_on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    pub fn apply(&self, metadata: &mut Metadata) {
        self.on_conflict
            .store(metadata, &self.field, self.values.clone());
    }
}

/// Copies the values of one field to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CopyTagger {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub on_conflict: OnConflict,
}

impl CopyTagger {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            on_conflict: OnConflict::Append,
        }
    }

    pub fn with_on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    pub fn apply(&self, reference: &str, metadata: &mut Metadata) {
        let values: Vec<String> = field_values(&self.from, reference, metadata)
            .into_iter()
            .map(str::to_string)
            .collect();

        if values.is_empty() {
            return;
        }
        self.on_conflict.store(metadata, &self.to, values);
    }
}

/// Runs extraction rules over the document text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPatternTagger {
    pub rules: FieldExtractor,
}

impl TextPatternTagger {
    pub fn new(rules: FieldExtractor) -> Self {
        Self { rules }
    }

    pub fn apply(&self, text: &str, metadata: &mut Metadata) -> FieldExtraction {
        let extraction = self.rules.extract(text);
        extraction.apply_to(metadata);
        extraction
    }
}

/// Tagger variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaggerHandler {
    Constant(ConstantTagger),
    Copy(CopyTagger),
    TextPattern(TextPatternTagger),
    External(ExternalProcessConfig),
}

impl TaggerHandler {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Constant(_) => "constant",
            Self::Copy(_) => "copy",
            Self::TextPattern(_) => "text_pattern",
            Self::External(_) => "external",
        }
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        match self {
            Self::Constant(tagger) if tagger.field.trim().is_empty() => Err(
                ImporterError::configuration("constant tagger requires a field"),
            ),
            Self::Copy(tagger) if tagger.from.trim().is_empty() || tagger.to.trim().is_empty() => {
                Err(ImporterError::configuration(
                    "copy tagger requires both 'from' and 'to'",
                ))
            }
            Self::TextPattern(tagger) => tagger.rules.validate(),
            Self::External(config) => config.validate(),
            _ => Ok(()),
        }
    }
}

impl From<ConstantTagger> for TaggerHandler {
    fn from(tagger: ConstantTagger) -> Self {
        Self::Constant(tagger)
    }
}

impl From<CopyTagger> for TaggerHandler {
    fn from(tagger: CopyTagger) -> Self {
        Self::Copy(tagger)
    }
}

impl From<TextPatternTagger> for TaggerHandler {
    fn from(tagger: TextPatternTagger) -> Self {
        Self::TextPattern(tagger)
    }
}

impl From<ExternalProcessConfig> for TaggerHandler {
    fn from(config: ExternalProcessConfig) -> Self {
        Self::External(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::ExtractionRule;
    use crate::domain::metadata;

    #[test]
    fn test_constant_on_conflict() {
        let mut meta: Metadata = [("source", "crawler")].into_iter().collect();

        ConstantTagger::new("source", ["manual"]).apply(&mut meta);
        assert_eq!(meta.get("source").unwrap(), &["crawler", "manual"]);

        ConstantTagger::new("source", ["fixed"])
            .with_on_conflict(OnConflict::KeepExisting)
            .apply(&mut meta);
        assert_eq!(meta.get("source").unwrap().len(), 2);

        ConstantTagger::new("source", ["fixed"])
            .with_on_conflict(OnConflict::Replace)
            .apply(&mut meta);
        assert_eq!(meta.get("source").unwrap(), &["fixed"]);
    }

    #[test]
    fn test_copy_reference() {
        let mut meta = Metadata::new();
        CopyTagger::new(metadata::REFERENCE, "url").apply("http://a/b", &mut meta);
        assert_eq!(meta.get_first("url"), Some("http://a/b"));
    }

    #[test]
    fn test_copy_missing_source_is_noop() {
        let mut meta: Metadata = [("to", "kept")].into_iter().collect();
        CopyTagger::new("from", "to")
            .with_on_conflict(OnConflict::Replace)
            .apply("doc", &mut meta);
        assert_eq!(meta.get("to").unwrap(), &["kept"]);
    }

    #[test]
    fn test_text_pattern() {
        let tagger = TextPatternTagger::new(FieldExtractor::new(vec![ExtractionRule::new(
            r"^Author: (.*)",
            "author",
            1,
        )]));
        let mut meta = Metadata::new();
        let extraction = tagger.apply("Title\nAuthor: Jane\nbody", &mut meta);

        assert_eq!(extraction.fields.len(), 1);
        assert_eq!(meta.get_first("author"), Some("Jane"));
    }

    #[test]
    fn test_validate() {
        assert!(TaggerHandler::from(ConstantTagger::new("", ["x"])).validate().is_err());
        assert!(TaggerHandler::from(CopyTagger::new("a", "b")).validate().is_ok());
        assert!(
            TaggerHandler::from(ExternalProcessConfig::new(""))
                .validate()
                .is_err()
        );
    }
}
