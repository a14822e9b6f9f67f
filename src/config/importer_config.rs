use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::document::{ContentFactory, DEFAULT_MAX_MEMORY_BYTES};
use crate::domain::handler::Handler;
use crate::domain::ImporterError;
use crate::infrastructure::parsers::ExternalParserConfig;

/// Importer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    pub logging: LoggingConfig,

    /// Directory for spilled content and process temp files
    pub temp_dir: Option<PathBuf>,

    /// Content larger than this is kept in a temp file
    pub max_memory_bytes: usize,

    /// Top-level documents imported at once by a batch
    pub max_concurrent_documents: usize,

    /// Deepest level of split children that is still processed
    pub max_split_depth: usize,

    /// Sniff the content and parse again when a parser rejects the detected type
    pub retry_on_content_type_mismatch: bool,

    pub pre_parse_handlers: Vec<Handler>,
    pub post_parse_handlers: Vec<Handler>,

    /// External programs registered as parsers
    pub parsers: Vec<ExternalParserConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            temp_dir: None,
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            max_concurrent_documents: 4,
            max_split_depth: 8,
            retry_on_content_type_mismatch: true,
            pre_parse_handlers: Vec::new(),
            post_parse_handlers: Vec::new(),
            parsers: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl ImporterConfig {
    /// Load from `config/importer.*`, `config/importer-local.*` and
    /// `IMPORTER__*` environment variables
    pub fn load() -> Result<Self, ImporterError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/importer").required(false))
            .add_source(config::File::with_name("config/importer-local").required(false));

        Self::build(builder)
    }

    /// Load from an explicit file, still honouring environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ImporterError> {
        let builder =
            config::Config::builder().add_source(config::File::from(path.as_ref()).required(true));

        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ImporterError> {
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("IMPORTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ImporterError::configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check limits and compile every configured pattern
    pub fn validate(&self) -> Result<(), ImporterError> {
        if self.max_concurrent_documents == 0 {
            return Err(ImporterError::configuration(
                "max_concurrent_documents must be at least 1",
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ImporterError::configuration("logging.level must not be empty"));
        }

        for handler in self.pre_parse_handlers.iter().chain(&self.post_parse_handlers) {
            handler.validate()?;
        }
        for parser in &self.parsers {
            parser.validate()?;
        }
        Ok(())
    }

    /// Content factory honouring the spill threshold and temp directory
    pub fn content_factory(&self) -> ContentFactory {
        let factory = ContentFactory::new(self.max_memory_bytes);
        match self.temp_dir {
            Some(ref dir) => factory.with_temp_dir(dir),
            None => factory,
        }
    }
}
