//! Domain layer - documents, handlers and import responses

pub mod chunker;
pub mod condition;
pub mod content_type;
pub mod document;
pub mod error;
pub mod extraction;
pub mod handler;
pub mod metadata;
pub mod parser;
pub mod process;
pub mod response;

pub use chunker::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
pub use condition::{CachedPattern, RestrictTo, RestrictToSet};
pub use document::{ContentFactory, Document, DocumentContent};
pub use error::ImporterError;
pub use extraction::{ExtractionRule, FieldExtraction, FieldExtractor, FieldSelector};
pub use handler::{
    ChunkSplitter, ChunkStrategy, ConstantTagger, CopyTagger, FilterHandler, Handler,
    HandlerKind, HandlerOutcome, OnConflict, OnMatch, RegexMetadataFilter, RegexReferenceFilter,
    ReplaceTransformer, Replacement, SplitterHandler, TaggerHandler, TextPatternTagger,
    TransformerHandler,
};
pub use metadata::Metadata;
pub use parser::{DocumentParser, ParsedDocument, ParserInput};
pub use process::{ExternalProcessConfig, MetadataFormat, Placeholder};
pub use response::{ImporterResponse, ImporterStatus, ResponseId, ResponseTree, Status};
