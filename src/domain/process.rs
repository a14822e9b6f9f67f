//! External process configuration

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ImporterError;
use super::extraction::{ExtractionRule, FieldExtractor};

/// Tokens substituted in command lines and environment values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Temp file holding the document content
    Input,
    /// Temp file the process writes its output to
    Output,
    /// Temp file holding the document metadata
    InputMeta,
    /// Temp file the process writes metadata to
    OutputMeta,
    /// The document reference
    Reference,
}

impl Placeholder {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Input => "${INPUT}",
            Self::Output => "${OUTPUT}",
            Self::InputMeta => "${INPUT_META}",
            Self::OutputMeta => "${OUTPUT_META}",
            Self::Reference => "${REFERENCE}",
        }
    }
}

/// Key/value layout of metadata files exchanged with a process
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFormat {
    /// `key=value` per line
    #[default]
    Properties,
    /// `key:value` per line
    Colon,
    /// A JSON object of strings or string arrays
    Json,
}

fn default_fail_on_non_zero_exit() -> bool {
    true
}

/// How to run an external program against a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalProcessConfig {
    /// Command line with optional placeholders
    pub command: String,

    /// Extra environment variables, placeholders allowed in values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    /// Rules applied to stdout and stderr
    #[serde(default, skip_serializing_if = "FieldExtractor::is_empty")]
    pub metadata_extraction_patterns: FieldExtractor,

    #[serde(default)]
    pub metadata_input_format: MetadataFormat,

    #[serde(default)]
    pub metadata_output_format: MetadataFormat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Whether a non-zero exit status fails the document
    #[serde(default = "default_fail_on_non_zero_exit")]
    pub fail_on_non_zero_exit: bool,
}

impl ExternalProcessConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            environment: BTreeMap::new(),
            metadata_extraction_patterns: FieldExtractor::default(),
            metadata_input_format: MetadataFormat::default(),
            metadata_output_format: MetadataFormat::default(),
            timeout_ms: None,
            fail_on_non_zero_exit: true,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_extraction_rule(mut self, rule: ExtractionRule) -> Self {
        self.metadata_extraction_patterns = self.metadata_extraction_patterns.with_rule(rule);
        self
    }

    pub fn with_metadata_formats(mut self, input: MetadataFormat, output: MetadataFormat) -> Self {
        self.metadata_input_format = input;
        self.metadata_output_format = output;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_fail_on_non_zero_exit(mut self, fail: bool) -> Self {
        self.fail_on_non_zero_exit = fail;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Whether the command line or any environment value uses the placeholder
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        let token = placeholder.token();
        self.command.contains(token) || self.environment.values().any(|v| v.contains(token))
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        if self.command.trim().is_empty() {
            return Err(ImporterError::configuration(
                "External process command cannot be empty",
            ));
        }

        if self.timeout_ms == Some(0) {
            return Err(ImporterError::configuration(
                "External process timeout must be greater than 0",
            ));
        }

        self.metadata_extraction_patterns.validate()
    }
}
