//! Importer configuration

mod importer_config;

pub use importer_config::{ImporterConfig, LogFormat, LoggingConfig};
