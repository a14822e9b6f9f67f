//! Document import pipeline
//!
//! A document goes through the pre-parse handlers, extraction, then the
//! post-parse handlers. Children produced by splitters re-enter the
//! pipeline from the start and their responses are nested under the
//! parent's. Failures stay inside the branch that raised them.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::{join_all, BoxFuture};
use futures::{FutureExt, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::config::ImporterConfig;
use crate::domain::content_type;
use crate::domain::document::{ContentFactory, Document};
use crate::domain::handler::{Handler, HandlerOutcome};
use crate::domain::metadata::{self, Metadata};
use crate::domain::parser::{DocumentParser, ParsedDocument, ParserInput};
use crate::domain::response::{ImporterResponse, ImporterStatus, ResponseTree};
use crate::domain::ImporterError;

use super::handler::HandlerExecutor;
use super::parsers::ParserRegistry;

/// Where a document's own processing ended
enum Stage {
    Rejected(String),
    Done(Vec<Document>),
}

/// Runs documents through the configured handlers and parsers
#[derive(Debug, Clone)]
pub struct Importer {
    config: Arc<ImporterConfig>,
    factory: ContentFactory,
    registry: ParserRegistry,
    executor: HandlerExecutor,
}

impl Importer {
    /// Build an importer from a validated configuration
    pub fn new(config: ImporterConfig) -> Result<Self, ImporterError> {
        config.validate()?;

        let factory = config.content_factory();
        let registry = ParserRegistry::with_external(&config.parsers, &factory);

        Ok(Self {
            executor: HandlerExecutor::new(factory.clone()),
            config: Arc::new(config),
            factory,
            registry,
        })
    }

    /// Register a parser taking precedence over the configured ones and
    /// any registered earlier
    pub fn with_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.registry.register(parser);
        self
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Import raw bytes
    pub async fn import(
        &self,
        reference: impl Into<String>,
        bytes: impl Into<Bytes>,
        metadata: Metadata,
    ) -> ResponseTree {
        let reference = reference.into();
        match self.factory.create(bytes).await {
            Ok(content) => {
                self.import_document(Document::new(reference, content).with_metadata(metadata))
                    .await
            }
            Err(e) => ResponseTree::new(ImporterResponse::new(reference, ImporterStatus::error(e))),
        }
    }

    /// Import a prepared document
    #[instrument(skip_all, fields(reference = %document.reference()))]
    pub async fn import_document(&self, document: Document) -> ResponseTree {
        let tree = self.process(document, 0).await;

        let root = tree.root_response();
        info!(
            status = ?root.map(|r| r.status().status),
            responses = tree.len(),
            success = tree.is_success(),
            "Document imported"
        );
        tree
    }

    /// Import many documents concurrently, keeping their order
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn import_batch(&self, documents: Vec<Document>) -> Vec<ResponseTree> {
        futures::stream::iter(documents)
            .map(|document| self.import_document(document))
            .buffered(self.config.max_concurrent_documents.max(1))
            .collect()
            .await
    }

    fn process(&self, mut document: Document, depth: usize) -> BoxFuture<'_, ResponseTree> {
        async move {
            let reference = document.reference().to_string();

            let children = match self.run_stages(&mut document).await {
                Ok(Stage::Done(children)) => children,
                Ok(Stage::Rejected(handler)) => {
                    debug!(reference = %reference, handler = %handler, "Document rejected");
                    return ResponseTree::new(ImporterResponse::new(
                        reference,
                        ImporterStatus::rejected(format!("Rejected by '{}'", handler)),
                    ));
                }
                Err(e) => {
                    debug!(reference = %reference, error = %e, "Document failed");
                    return ResponseTree::new(
                        ImporterResponse::new(reference, ImporterStatus::error(e))
                            .with_document(document),
                    );
                }
            };

            let mut tree = ResponseTree::new(ImporterResponse::success(document));
            if children.is_empty() {
                return tree;
            }

            let root = tree.root();
            if depth >= self.config.max_split_depth {
                warn!(
                    reference = %reference,
                    depth,
                    children = children.len(),
                    "Split depth limit reached, children not imported"
                );
                for child in children {
                    let error = ImporterError::handler(
                        "splitter",
                        format!("split depth limit of {} reached", self.config.max_split_depth),
                    );
                    tree.add_nested(
                        root,
                        ImporterResponse::new(child.reference(), ImporterStatus::error(error)),
                    );
                }
                return tree;
            }

            let subtrees = join_all(
                children
                    .into_iter()
                    .map(|child| self.process(child, depth + 1)),
            )
            .await;
            for subtree in subtrees {
                tree.graft(root, subtree);
            }
            tree
        }
        .boxed()
    }

    async fn run_stages(&self, document: &mut Document) -> Result<Stage, ImporterError> {
        let mut children = Vec::new();

        if let Some(handler) = self
            .run_handlers(&self.config.pre_parse_handlers, document, &mut children)
            .await?
        {
            return Ok(Stage::Rejected(handler));
        }

        self.extract(document).await?;

        if let Some(handler) = self
            .run_handlers(&self.config.post_parse_handlers, document, &mut children)
            .await?
        {
            return Ok(Stage::Rejected(handler));
        }

        Ok(Stage::Done(children))
    }

    /// Apply handlers in order, returning the label of a rejecting filter
    async fn run_handlers(
        &self,
        handlers: &[Handler],
        document: &mut Document,
        children: &mut Vec<Document>,
    ) -> Result<Option<String>, ImporterError> {
        for handler in handlers {
            match self.executor.apply(handler, document).await? {
                HandlerOutcome::Rejected => return Ok(Some(handler.label())),
                HandlerOutcome::Split(split) => children.extend(split),
                HandlerOutcome::Skipped | HandlerOutcome::Accepted | HandlerOutcome::Applied => {}
            }
        }
        Ok(None)
    }

    /// Replace the content with extracted text and merge extracted metadata
    async fn extract(&self, document: &mut Document) -> Result<(), ImporterError> {
        let bytes = document.content().to_bytes().await?;
        let detected = content_type::detect(document.reference(), document.metadata(), &bytes);

        let (content_type, parsed) = match self.parse_as(document, &detected).await {
            Ok(parsed) => (detected, parsed),
            Err(e) if e.is_content_type_mismatch() && self.config.retry_on_content_type_mismatch => {
                let sniffed = content_type::sniff(&bytes);
                if sniffed == detected {
                    return Err(e);
                }
                warn!(
                    reference = %document.reference(),
                    detected = %detected,
                    sniffed,
                    error = %e,
                    "Content type mismatch, retrying with sniffed type"
                );
                (sniffed.to_string(), self.parse_as(document, sniffed).await?)
            }
            Err(e) => return Err(e),
        };

        if let Some(failure) = parsed.failure {
            document.metadata_mut().merge(parsed.metadata);
            return Err(failure);
        }

        debug!(
            reference = %document.reference(),
            content_type = %content_type,
            chars = parsed.text.chars().count(),
            "Extracted document"
        );

        let content = self.factory.create(parsed.text).await?;
        document.set_content(content);
        let fields = document.metadata_mut();
        fields.set(metadata::CONTENT_TYPE, [content_type]);
        fields.merge(parsed.metadata);
        document.mark_parsed();
        Ok(())
    }

    async fn parse_as(
        &self,
        document: &Document,
        content_type: &str,
    ) -> Result<ParsedDocument, ImporterError> {
        let parser = self.registry.resolve(content_type).ok_or_else(|| {
            ImporterError::extraction(
                document.reference(),
                format!("no parser for content type '{}'", content_type),
            )
        })?;

        debug!(reference = %document.reference(), parser = parser.name(), content_type, "Parsing");

        let input = ParserInput::new(document.reference(), content_type, document.content().clone())
            .with_metadata(document.metadata().clone());
        parser.parse(&input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::RestrictTo;
    use crate::domain::handler::{
        ChunkSplitter, ChunkStrategy, ConstantTagger, RegexMetadataFilter, RegexReferenceFilter,
    };
    use crate::domain::parser::mock::MockDocumentParser;
    use crate::domain::response::Status;

    fn importer(pre: Vec<Handler>, post: Vec<Handler>) -> Importer {
        Importer::new(ImporterConfig {
            pre_parse_handlers: pre,
            post_parse_handlers: post,
            ..ImporterConfig::default()
        })
        .unwrap()
    }

    fn status(tree: &ResponseTree) -> Status {
        tree.root_response().unwrap().status().status
    }

    #[tokio::test]
    async fn test_plain_import() {
        let importer = importer(
            vec![],
            vec![Handler::tagger(ConstantTagger::new("source", ["test"]))],
        );

        let tree = importer.import("notes.txt", "hello world", Metadata::new()).await;

        assert_eq!(status(&tree), Status::Success);
        assert!(tree.is_success());
        let document = tree.root_response().unwrap().document().unwrap();
        assert!(document.is_parsed());
        assert_eq!(document.metadata().get_first("source"), Some("test"));
        assert_eq!(
            document.metadata().get_first(metadata::CONTENT_TYPE),
            Some(content_type::PLAIN_TEXT)
        );
    }

    #[tokio::test]
    async fn test_html_is_extracted() {
        let importer = importer(vec![], vec![]);
        let html = "<html><head><title>Greeting</title></head><body><p>Hi there</p></body></html>";

        let tree = importer.import("page.html", html, Metadata::new()).await;

        let document = tree.root_response().unwrap().document().unwrap();
        assert_eq!(document.metadata().get_first("title"), Some("Greeting"));
        let text = document.content().to_text_lossy().await.unwrap();
        assert!(text.contains("Hi there"));
        assert!(!text.contains("<p>"));
    }

    #[tokio::test]
    async fn test_pre_parse_filter_rejects() {
        let importer = importer(
            vec![Handler::filter(RegexReferenceFilter::new(r".*\.txt")).with_name("only-text")],
            vec![],
        );

        let tree = importer.import("image.png", vec![0u8, 1, 2], Metadata::new()).await;

        let root = tree.root_response().unwrap();
        assert_eq!(root.status().status, Status::Rejected);
        assert!(root.status().description.as_deref().unwrap().contains("only-text"));
        assert!(root.document().is_none());
        assert!(!tree.is_success());
    }

    #[tokio::test]
    async fn test_post_parse_filter_sees_extracted_metadata() {
        let importer = importer(
            vec![],
            vec![Handler::filter(RegexMetadataFilter::new("title", ".*potato.*"))],
        );
        let page = |title: &str| {
            format!("<html><head><title>{}</title></head><body>x</body></html>", title)
        };

        let kept = importer.import("a.html", page("Potato salad"), Metadata::new()).await;
        let dropped = importer.import("b.html", page("Carrot cake"), Metadata::new()).await;

        assert_eq!(status(&kept), Status::Success);
        assert_eq!(status(&dropped), Status::Rejected);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_an_error() {
        let importer = importer(vec![], vec![]);

        let tree = importer.import("blob.bin", vec![0u8, 159, 146, 150], Metadata::new()).await;

        let root = tree.root_response().unwrap();
        assert_eq!(root.status().status, Status::Error);
        assert_eq!(root.status().error.as_ref().unwrap().kind(), "extraction");
        assert!(root.document().is_some());
    }

    #[tokio::test]
    async fn test_mismatch_retries_with_sniffed_type() {
        let parser = Arc::new(
            MockDocumentParser::new()
                .with_content_types(&["text/html", "text/plain"])
                .with_error(ImporterError::content_type_mismatch("text/html", "not html")),
        );
        let importer = importer(vec![], vec![]).with_parser(parser.clone());

        let tree = importer.import("fake.html", "plain words", Metadata::new()).await;

        assert_eq!(status(&tree), Status::Success);
        assert_eq!(parser.calls(), 2);
        assert_eq!(parser.seen_types(), vec!["text/html", "text/plain"]);
    }

    #[tokio::test]
    async fn test_mismatch_retry_can_be_disabled() {
        let parser = Arc::new(
            MockDocumentParser::new()
                .with_error(ImporterError::content_type_mismatch("text/html", "not html")),
        );
        let importer = Importer::new(ImporterConfig {
            retry_on_content_type_mismatch: false,
            ..ImporterConfig::default()
        })
        .unwrap()
        .with_parser(parser.clone());

        let tree = importer.import("fake.html", "plain words", Metadata::new()).await;

        assert_eq!(status(&tree), Status::Error);
        assert_eq!(parser.calls(), 1);
    }

    #[tokio::test]
    async fn test_split_builds_nested_tree() {
        let splitter = Handler::splitter(ChunkSplitter::new(ChunkStrategy::Paragraph, 25));
        let importer = importer(vec![], vec![splitter]);

        let tree = importer
            .import("doc.txt", "First paragraph here.\n\nSecond paragraph here.", Metadata::new())
            .await;

        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.len(), 3);
        let root = tree.root();
        let leaves: Vec<_> = tree
            .iter()
            .filter(|(id, _)| tree.nested(*id).is_empty())
            .collect();
        assert_eq!(leaves.len(), 2);
        for (id, response) in leaves {
            assert_eq!(tree.parent(id), Some(root));
            assert!(response.status().is_success());
        }
        assert_eq!(
            tree.get(tree.nested(root)[0]).unwrap().reference(),
            "doc.txt_chunk_0"
        );
        assert!(tree.is_success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_error_stays_in_branch() {
        use crate::domain::process::ExternalProcessConfig;

        let splitter = Handler::splitter(ChunkSplitter::new(ChunkStrategy::Paragraph, 10));
        let failing = Handler::transformer(ExternalProcessConfig::new("sh -c 'exit 2'"))
            .restrict_to(RestrictTo::new(metadata::REFERENCE, ".*_chunk_1"));
        let importer = importer(vec![], vec![splitter, failing]);

        let tree = importer.import("doc.txt", "aaaa bbbb\n\ncccc dddd", Metadata::new()).await;

        let root = tree.root();
        assert_eq!(status(&tree), Status::Success);
        let nested = tree.nested(root);
        assert_eq!(nested.len(), 2);
        assert!(tree.get(nested[0]).unwrap().status().is_success());

        let failed = tree.get(nested[1]).unwrap();
        assert_eq!(failed.reference(), "doc.txt_chunk_1");
        assert_eq!(failed.status().error.as_ref().unwrap().kind(), "process_exit");
        assert!(failed.document().is_some());
        assert!(!tree.is_success());
    }

    #[tokio::test]
    async fn test_split_depth_limit() {
        let splitter = Handler::splitter(ChunkSplitter::new(ChunkStrategy::Paragraph, 10));
        let importer = Importer::new(ImporterConfig {
            max_split_depth: 0,
            post_parse_handlers: vec![splitter],
            ..ImporterConfig::default()
        })
        .unwrap();

        let tree = importer.import("doc.txt", "aaaa bbbb\n\ncccc dddd", Metadata::new()).await;

        assert_eq!(status(&tree), Status::Success);
        let nested = tree.nested(tree.root());
        assert_eq!(nested.len(), 2);
        for id in nested {
            let response = tree.get(*id).unwrap();
            assert!(response.status().is_error());
            assert!(response.status().description.as_deref().unwrap().contains("split depth limit"));
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let importer = Importer::new(ImporterConfig {
            max_concurrent_documents: 2,
            pre_parse_handlers: vec![Handler::filter(RegexReferenceFilter::new(r"keep-.*"))],
            ..ImporterConfig::default()
        })
        .unwrap();
        let documents = ["keep-1.txt", "drop.txt", "keep-2.txt", "keep-3.txt"]
            .into_iter()
            .map(|reference| Document::from_text(reference, "text"))
            .collect();

        let trees = importer.import_batch(documents).await;

        let references: Vec<_> = trees
            .iter()
            .map(|t| t.root_response().unwrap().reference().to_string())
            .collect();
        assert_eq!(references, vec!["keep-1.txt", "drop.txt", "keep-2.txt", "keep-3.txt"]);
        assert_eq!(status(&trees[1]), Status::Rejected);
        assert_eq!(trees.iter().filter(|t| t.is_success()).count(), 3);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = ImporterConfig {
            pre_parse_handlers: vec![Handler::filter(RegexReferenceFilter::new("(oops"))],
            ..ImporterConfig::default()
        };
        assert!(Importer::new(config).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_external_parser_registration() {
        use crate::domain::process::ExternalProcessConfig;
        use crate::infrastructure::parsers::ExternalParserConfig;

        let importer = Importer::new(ImporterConfig {
            parsers: vec![ExternalParserConfig::new(
                ["text/csv"],
                ExternalProcessConfig::new("tr , ' '"),
            )],
            ..ImporterConfig::default()
        })
        .unwrap();

        let tree = importer.import("table.csv", "a,b,c", Metadata::new()).await;

        let document = tree.root_response().unwrap().document().unwrap();
        assert_eq!(document.content().to_text_lossy().await.unwrap(), "a b c");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_added_parser_beats_configured_parser() {
        use crate::domain::process::ExternalProcessConfig;
        use crate::infrastructure::parsers::ExternalParserConfig;

        let parser = Arc::new(MockDocumentParser::new().with_content_types(&["text/plain"]));
        let importer = Importer::new(ImporterConfig {
            parsers: vec![ExternalParserConfig::new(
                ["text/plain"],
                ExternalProcessConfig::new("tr a-z A-Z"),
            )],
            ..ImporterConfig::default()
        })
        .unwrap()
        .with_parser(parser.clone());

        let tree = importer.import("notes.txt", "hello", Metadata::new()).await;

        assert_eq!(parser.calls(), 1);
        let document = tree.root_response().unwrap().document().unwrap();
        assert_eq!(document.content().to_text_lossy().await.unwrap(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_tagger_keeps_harvested_fields() {
        use crate::domain::extraction::ExtractionRule;
        use crate::domain::process::ExternalProcessConfig;

        let tagger = Handler::tagger(
            ExternalProcessConfig::new("sh -c 'echo tag=harvested; exit 1'")
                .with_extraction_rule(ExtractionRule::new("^tag=(.*)", "tag", 1)),
        );
        let importer = importer(vec![], vec![tagger]);

        let tree = importer.import("doc.txt", "body", Metadata::new()).await;

        let root = tree.root_response().unwrap();
        assert_eq!(root.status().status, Status::Error);
        assert_eq!(root.status().error.as_ref().unwrap().kind(), "process_exit");
        let document = root.document().unwrap();
        assert_eq!(document.metadata().get_first("tag"), Some("harvested"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_external_parser_keeps_harvested_fields() {
        use crate::domain::extraction::ExtractionRule;
        use crate::domain::process::ExternalProcessConfig;
        use crate::infrastructure::parsers::ExternalParserConfig;

        let importer = Importer::new(ImporterConfig {
            parsers: vec![ExternalParserConfig::new(
                ["text/csv"],
                ExternalProcessConfig::new("sh -c 'echo rows=2; exit 4'")
                    .with_extraction_rule(ExtractionRule::new(r"^rows=(\d+)", "rows", 1)),
            )],
            ..ImporterConfig::default()
        })
        .unwrap();

        let tree = importer.import("table.csv", "a,b\nc,d", Metadata::new()).await;

        let root = tree.root_response().unwrap();
        assert_eq!(root.status().status, Status::Error);
        let document = root.document().unwrap();
        assert_eq!(document.metadata().get_first("rows"), Some("2"));
        assert!(!document.is_parsed());
    }
}
