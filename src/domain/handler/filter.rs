//! Filters accepting or rejecting documents

use serde::{Deserialize, Serialize};

use crate::domain::condition::{field_values, CachedPattern};
use crate::domain::metadata::Metadata;
use crate::domain::ImporterError;

/// What a filter does with documents its pattern matches
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnMatch {
    #[default]
    Include,
    Exclude,
}

impl OnMatch {
    /// Acceptance decision for a match result
    pub fn accepts(&self, matched: bool) -> bool {
        matched == (*self == Self::Include)
    }
}

/// Filter on the values of a metadata field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegexMetadataFilter {
    pub field: String,

    /// Blank means every document is accepted
    #[serde(flatten)]
    pub pattern: CachedPattern,

    #[serde(default)]
    pub on_match: OnMatch,
}

impl RegexMetadataFilter {
    pub fn new(field: impl Into<String>, regex: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            pattern: CachedPattern::new(regex),
            on_match: OnMatch::Include,
        }
    }

    pub fn with_on_match(mut self, on_match: OnMatch) -> Self {
        self.on_match = on_match;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.pattern.set_case_sensitive(case_sensitive);
        self
    }

    pub fn accepts(&self, reference: &str, metadata: &Metadata) -> Result<bool, ImporterError> {
        if self.pattern.is_blank() {
            return Ok(true);
        }

        let regex = self.pattern.anchored()?;
        let matched = field_values(&self.field, reference, metadata)
            .iter()
            .any(|value| regex.is_match(value));

        Ok(self.on_match.accepts(matched))
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        if self.field.trim().is_empty() {
            return Err(ImporterError::configuration(
                "regex_metadata filter requires a field",
            ));
        }
        if self.pattern.is_blank() {
            return Ok(());
        }
        self.pattern.validate()
    }
}

/// Filter on the document reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegexReferenceFilter {
    #[serde(flatten)]
    pub pattern: CachedPattern,

    #[serde(default)]
    pub on_match: OnMatch,
}

impl RegexReferenceFilter {
    pub fn new(regex: impl Into<String>) -> Self {
        Self {
            pattern: CachedPattern::new(regex),
            on_match: OnMatch::Include,
        }
    }

    pub fn with_on_match(mut self, on_match: OnMatch) -> Self {
        self.on_match = on_match;
        self
    }

    pub fn accepts(&self, reference: &str) -> Result<bool, ImporterError> {
        if self.pattern.is_blank() {
            return Ok(true);
        }
        Ok(self.on_match.accepts(self.pattern.is_full_match(reference)?))
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        if self.pattern.is_blank() {
            return Ok(());
        }
        self.pattern.validate()
    }
}

/// Filter variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterHandler {
    RegexMetadata(RegexMetadataFilter),
    RegexReference(RegexReferenceFilter),
}

impl FilterHandler {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RegexMetadata(_) => "regex_metadata",
            Self::RegexReference(_) => "regex_reference",
        }
    }

    pub fn accepts(&self, reference: &str, metadata: &Metadata) -> Result<bool, ImporterError> {
        match self {
            Self::RegexMetadata(filter) => filter.accepts(reference, metadata),
            Self::RegexReference(filter) => filter.accepts(reference),
        }
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        match self {
            Self::RegexMetadata(filter) => filter.validate(),
            Self::RegexReference(filter) => filter.validate(),
        }
    }
}

impl From<RegexMetadataFilter> for FilterHandler {
    fn from(filter: RegexMetadataFilter) -> Self {
        Self::RegexMetadata(filter)
    }
}

impl From<RegexReferenceFilter> for FilterHandler {
    fn from(filter: RegexReferenceFilter) -> Self {
        Self::RegexReference(filter)
    }
}
