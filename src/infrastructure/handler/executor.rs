//! Handler execution

use tracing::{debug, warn};

use crate::domain::document::{ContentFactory, Document};
use crate::domain::extraction::FieldExtraction;
use crate::domain::handler::{
    ChunkSplitter, FilterHandler, Handler, HandlerKind, HandlerOutcome, SplitterHandler,
    TaggerHandler, TransformerHandler,
};
use crate::domain::metadata::{self, Metadata};
use crate::domain::process::ExternalProcessConfig;
use crate::domain::{content_type, ImporterError};
use crate::infrastructure::chunkers::chunker_for;
use crate::infrastructure::process::{ExternalProcessRunner, ProcessOutput};

/// Dispatches a handler to the code implementing its kind
#[derive(Debug, Clone, Default)]
pub struct HandlerExecutor {
    factory: ContentFactory,
}

impl HandlerExecutor {
    pub fn new(factory: ContentFactory) -> Self {
        Self { factory }
    }

    /// Apply one handler to a document
    ///
    /// Handlers whose conditions do not match are skipped without touching
    /// the document. Failures are attributed to the handler, except process
    /// errors which keep their own kind.
    pub async fn apply(
        &self,
        handler: &Handler,
        document: &mut Document,
    ) -> Result<HandlerOutcome, ImporterError> {
        let label = handler.label();

        let applies = handler
            .should_apply(document.reference(), document.metadata())
            .map_err(|e| attribute(&label, e))?;
        if !applies {
            debug!(
                handler = %label,
                reference = %document.reference(),
                "Handler conditions not met, skipping"
            );
            return Ok(HandlerOutcome::Skipped);
        }

        let outcome = match &handler.kind {
            HandlerKind::Filter(filter) => self.filter(filter, document),
            HandlerKind::Tagger(tagger) => self.tag(tagger, document).await,
            HandlerKind::Transformer(transformer) => self.transform(transformer, document).await,
            HandlerKind::Splitter(splitter) => self.split(splitter, document).await,
        }
        .map_err(|e| attribute(&label, e))?;

        debug!(
            handler = %label,
            reference = %document.reference(),
            outcome = outcome_name(&outcome),
            "Handler applied"
        );
        Ok(outcome)
    }

    fn filter(
        &self,
        filter: &FilterHandler,
        document: &Document,
    ) -> Result<HandlerOutcome, ImporterError> {
        if filter.accepts(document.reference(), document.metadata())? {
            Ok(HandlerOutcome::Accepted)
        } else {
            Ok(HandlerOutcome::Rejected)
        }
    }

    async fn tag(
        &self,
        tagger: &TaggerHandler,
        document: &mut Document,
    ) -> Result<HandlerOutcome, ImporterError> {
        match tagger {
            TaggerHandler::Constant(constant) => constant.apply(document.metadata_mut()),
            TaggerHandler::Copy(copy) => {
                let reference = document.reference().to_string();
                copy.apply(&reference, document.metadata_mut());
            }
            TaggerHandler::TextPattern(text_pattern) => {
                let text = document.content().to_text_lossy().await?;
                let extraction = text_pattern.apply(&text, document.metadata_mut());
                log_extraction_errors(document.reference(), &extraction);
            }
            TaggerHandler::External(config) => {
                let output = self.run_external(config, document).await?;
                let exit = output.check_exit(config);
                document.metadata_mut().merge(output.metadata);
                exit?;
            }
        }
        Ok(HandlerOutcome::Applied)
    }

    async fn transform(
        &self,
        transformer: &TransformerHandler,
        document: &mut Document,
    ) -> Result<HandlerOutcome, ImporterError> {
        match transformer {
            TransformerHandler::Replace(replace) => {
                let text = document.content().to_text_lossy().await?;
                let replaced = replace.apply(&text)?;
                document.set_content(self.factory.create(replaced).await?);
            }
            TransformerHandler::External(config) => {
                // Harvested fields survive a failed exit; the content only
                // changes when the exit is accepted
                let output = self.run_external(config, document).await?;
                let exit = output.check_exit(config);
                document.metadata_mut().merge(output.metadata);
                exit?;
                document.set_content(output.content);
            }
        }
        Ok(HandlerOutcome::Applied)
    }

    async fn split(
        &self,
        splitter: &SplitterHandler,
        document: &Document,
    ) -> Result<HandlerOutcome, ImporterError> {
        match splitter {
            SplitterHandler::Chunk(chunk) => self.split_chunks(chunk, document).await,
        }
    }

    async fn split_chunks(
        &self,
        splitter: &ChunkSplitter,
        document: &Document,
    ) -> Result<HandlerOutcome, ImporterError> {
        let text = document.content().to_text_lossy().await?;
        let chunker = chunker_for(splitter.strategy);
        let chunks = chunker.chunk(&text, &splitter.chunking_config())?;

        // Content already fitting one chunk is left whole
        if chunks.len() <= 1 {
            return Ok(HandlerOutcome::Split(Vec::new()));
        }

        let parent = document.reference();
        let mut children = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let reference = format!("{}_chunk_{}", parent, chunk.metadata.chunk_index);

            let mut fields = if splitter.inherit_metadata {
                document.metadata().clone()
            } else {
                Metadata::new()
            };
            fields.set(metadata::REFERENCE, [reference.as_str()]);
            fields.set(metadata::CONTENT_TYPE, [content_type::PLAIN_TEXT]);
            fields.set(metadata::EMBEDDED_PARENT_REFERENCE, [parent]);
            fields.set(
                metadata::EMBEDDED_REFERENCE,
                [chunk.metadata.chunk_index.to_string()],
            );
            fields.set(metadata::CHUNK_INDEX, [chunk.metadata.chunk_index.to_string()]);
            fields.set(metadata::CHUNK_TOTAL, [chunk.metadata.total_chunks.to_string()]);
            fields.set(metadata::CHUNK_CHAR_START, [chunk.metadata.char_start.to_string()]);
            fields.set(metadata::CHUNK_CHAR_END, [chunk.metadata.char_end.to_string()]);

            let content = self.factory.create(chunk.content).await?;
            children.push(Document::new(reference, content).with_metadata(fields));
        }

        debug!(
            reference = %parent,
            strategy = chunker.name(),
            children = children.len(),
            "Split document into chunks"
        );
        Ok(HandlerOutcome::Split(children))
    }

    async fn run_external(
        &self,
        config: &ExternalProcessConfig,
        document: &Document,
    ) -> Result<ProcessOutput, ImporterError> {
        let runner = ExternalProcessRunner::new(config.clone(), self.factory.clone());
        let output = runner
            .run(document.reference(), document.content(), document.metadata())
            .await?;

        for error in &output.extraction_errors {
            warn!(reference = %document.reference(), error = %error, "Skipped extraction rule");
        }
        Ok(output)
    }
}

fn log_extraction_errors(reference: &str, extraction: &FieldExtraction) {
    for error in &extraction.errors {
        warn!(reference = %reference, error = %error, "Skipped extraction rule");
    }
}

fn outcome_name(outcome: &HandlerOutcome) -> &'static str {
    match outcome {
        HandlerOutcome::Skipped => "skipped",
        HandlerOutcome::Accepted => "accepted",
        HandlerOutcome::Rejected => "rejected",
        HandlerOutcome::Applied => "applied",
        HandlerOutcome::Split(_) => "split",
    }
}

/// Name the failing handler unless the error already identifies its source
fn attribute(label: &str, error: ImporterError) -> ImporterError {
    match error {
        ImporterError::ProcessLaunch { .. }
        | ImporterError::ProcessTimeout { .. }
        | ImporterError::ProcessExit { .. }
        | ImporterError::Handler { .. } => error,
        other => ImporterError::handler(label, other.to_string()),
    }
}
