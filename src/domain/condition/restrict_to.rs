//! Field + pattern predicates

use serde::{Deserialize, Serialize};

use super::pattern::CachedPattern;
use crate::domain::ImporterError;
use crate::domain::metadata::{self, Metadata};

/// Restricts a handler to documents whose field matches a pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestrictTo {
    /// Metadata field to test; `document.reference` addresses the reference
    pub field: String,

    #[serde(flatten)]
    pub pattern: CachedPattern,
}

impl RestrictTo {
    /// Create a case-insensitive condition
    pub fn new(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            pattern: CachedPattern::new(pattern),
        }
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.pattern.set_case_sensitive(case_sensitive);
        self
    }

    /// Whether any value of the field fully matches the pattern
    pub fn matches(&self, reference: &str, metadata: &Metadata) -> Result<bool, ImporterError> {
        let regex = self.pattern.anchored()?;
        Ok(field_values(&self.field, reference, metadata)
            .iter()
            .any(|value| regex.is_match(value)))
    }
}

/// Values of a field, resolving the reference pseudo-field
///
/// Stored metadata for `document.reference` takes precedence over the
/// document's own reference.
pub fn field_values<'a>(field: &str, reference: &'a str, metadata: &'a Metadata) -> Vec<&'a str> {
    match metadata.get(field) {
        Some(values) => values.iter().map(String::as_str).collect(),
        None if metadata::same_field(field, metadata::REFERENCE) => vec![reference],
        None => Vec::new(),
    }
}

/// Whether a document satisfies any of the conditions
///
/// An empty condition list always matches.
pub fn matches(
    conditions: &[RestrictTo],
    reference: &str,
    metadata: &Metadata,
) -> Result<bool, ImporterError> {
    if conditions.is_empty() {
        return Ok(true);
    }

    for condition in conditions {
        if condition.matches(reference, metadata)? {
            return Ok(true);
        }
    }

    Ok(false)
}

/// OR-composed set of restrict-to conditions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RestrictToSet(Vec<RestrictTo>);

impl RestrictToSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: RestrictTo) -> Self {
        self.0.push(condition);
        self
    }

    pub fn push(&mut self, condition: RestrictTo) {
        self.0.push(condition);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RestrictTo> {
        self.0.iter()
    }

    pub fn matches(&self, reference: &str, metadata: &Metadata) -> Result<bool, ImporterError> {
        matches(&self.0, reference, metadata)
    }

    /// Compile every pattern
    pub fn validate(&self) -> Result<(), ImporterError> {
        for condition in &self.0 {
            if condition.field.trim().is_empty() {
                return Err(ImporterError::configuration(
                    "restrict_to condition requires a field",
                ));
            }
            condition.pattern.validate()?;
        }
        Ok(())
    }
}

impl From<Vec<RestrictTo>> for RestrictToSet {
    fn from(conditions: Vec<RestrictTo>) -> Self {
        Self(conditions)
    }
}
