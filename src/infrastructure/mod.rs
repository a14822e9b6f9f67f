//! Infrastructure layer - parsers, chunkers, subprocesses and the pipeline

pub mod chunkers;
pub mod handler;
pub mod logging;
pub mod parsers;
pub mod pipeline;
pub mod process;

pub use handler::HandlerExecutor;
pub use logging::init_logging;
pub use parsers::{ExternalParserConfig, ParserRegistry};
pub use pipeline::Importer;
pub use process::{ExternalProcessRunner, ProcessOutput};
