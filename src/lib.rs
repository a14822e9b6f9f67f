//! Document importer
//!
//! Turns raw documents into text plus metadata:
//! - Condition-gated filters, taggers, transformers and splitters
//! - Built-in and external-process parsers selected by content type
//! - Recursive splitting with one nested response per child document

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{ImporterConfig, LogFormat, LoggingConfig};
pub use domain::{Document, Handler, ImporterError, Metadata, ResponseTree};
pub use infrastructure::{init_logging, Importer};
