//! External process adapter

pub mod command;
pub mod metadata_io;
pub mod runner;

pub use command::{build_argv, tokenize, Bindings};
pub use metadata_io::{read_metadata, write_metadata};
pub use runner::{ExternalProcessRunner, ProcessOutput};
