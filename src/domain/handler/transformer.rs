//! Transformers rewriting document content

use serde::{Deserialize, Serialize};

use crate::domain::condition::CachedPattern;
use crate::domain::process::ExternalProcessConfig;
use crate::domain::ImporterError;

/// One search and replace step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Replacement {
    #[serde(flatten)]
    pub pattern: CachedPattern,

    /// Replacement text, `$1` style group references allowed
    #[serde(default)]
    pub replacement: String,
}

impl Replacement {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: CachedPattern::new(pattern),
            replacement: replacement.into(),
        }
    }
}

/// Applies replacements to the text content in order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReplaceTransformer {
    pub replacements: Vec<Replacement>,
}

impl ReplaceTransformer {
    pub fn new(replacements: Vec<Replacement>) -> Self {
        Self { replacements }
    }

    pub fn apply(&self, text: &str) -> Result<String, ImporterError> {
        let mut current = text.to_string();
        for step in &self.replacements {
            let regex = step.pattern.unanchored()?;
            current = regex
                .replace_all(&current, step.replacement.as_str())
                .into_owned();
        }
        Ok(current)
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        for step in &self.replacements {
            step.pattern.validate()?;
        }
        Ok(())
    }
}

/// Transformer variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformerHandler {
    Replace(ReplaceTransformer),
    External(ExternalProcessConfig),
}

impl TransformerHandler {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Replace(_) => "replace",
            Self::External(_) => "external",
        }
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        match self {
            Self::Replace(transformer) => transformer.validate(),
            Self::External(config) => config.validate(),
        }
    }
}

impl From<ReplaceTransformer> for TransformerHandler {
    fn from(transformer: ReplaceTransformer) -> Self {
        Self::Replace(transformer)
    }
}

impl From<ExternalProcessConfig> for TransformerHandler {
    fn from(config: ExternalProcessConfig) -> Self {
        Self::External(config)
    }
}
