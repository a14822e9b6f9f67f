//! External program used as a parser

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::document::ContentFactory;
use crate::domain::parser::{DocumentParser, ParsedDocument, ParserInput};
use crate::domain::process::ExternalProcessConfig;
use crate::domain::ImporterError;
use crate::infrastructure::process::ExternalProcessRunner;

/// Content types routed to an external parser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalParserConfig {
    /// Content type prefixes, e.g. `application/pdf`
    pub content_types: Vec<String>,

    #[serde(flatten)]
    pub process: ExternalProcessConfig,
}

impl ExternalParserConfig {
    pub fn new<I, S>(content_types: I, process: ExternalProcessConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content_types: content_types.into_iter().map(Into::into).collect(),
            process,
        }
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        if self.content_types.iter().all(|t| t.trim().is_empty()) {
            return Err(ImporterError::configuration(
                "External parser requires at least one content type",
            ));
        }
        self.process.validate()
    }
}

/// Parser delegating extraction to an external process
#[derive(Debug, Clone)]
pub struct ExternalParser {
    content_types: Vec<String>,
    runner: ExternalProcessRunner,
}

impl ExternalParser {
    pub fn new(config: ExternalParserConfig, factory: ContentFactory) -> Self {
        Self {
            content_types: config
                .content_types
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            runner: ExternalProcessRunner::new(config.process, factory),
        }
    }
}

#[async_trait]
impl DocumentParser for ExternalParser {
    fn name(&self) -> &str {
        &self.runner.config().command
    }

    fn supports(&self, content_type: &str) -> bool {
        self.content_types
            .iter()
            .any(|t| content_type.starts_with(t.as_str()))
    }

    async fn parse(&self, input: &ParserInput) -> Result<ParsedDocument, ImporterError> {
        let output = self
            .runner
            .run(&input.reference, &input.content, &input.metadata)
            .await?;
        let failure = output.check_exit(self.runner.config()).err();

        if !output.extraction_errors.is_empty() {
            debug!(
                errors = output.extraction_errors.len(),
                "Some extraction rules were skipped"
            );
        }

        if let Some(failure) = failure {
            return Ok(ParsedDocument {
                text: String::new(),
                metadata: output.metadata,
                failure: Some(failure),
            });
        }

        Ok(ParsedDocument {
            text: output.content.to_text_lossy().await?,
            metadata: output.metadata,
            failure: None,
        })
    }
}
