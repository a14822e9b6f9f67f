use thiserror::Error;

/// Errors raised while importing a document
///
/// Filter rejections are not errors; they are reported through the
/// response status instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ImporterError {
    #[error("Extraction failed for '{reference}': {message}")]
    Extraction { reference: String, message: String },

    #[error("Content does not match type '{content_type}': {message}")]
    ContentTypeMismatch {
        content_type: String,
        message: String,
    },

    #[error("Handler '{handler}' failed: {message}")]
    Handler { handler: String, message: String },

    #[error("Could not launch '{command}': {message}")]
    ProcessLaunch { command: String, message: String },

    #[error("Process '{command}' timed out after {timeout_ms}ms")]
    ProcessTimeout { command: String, timeout_ms: u64 },

    #[error("Process '{command}' exited with status {}", .exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    ProcessExit {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("Invalid pattern '{pattern}': {message}")]
    PatternCompile { pattern: String, message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ImporterError {
    pub fn extraction(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            reference: reference.into(),
            message: message.into(),
        }
    }

    pub fn content_type_mismatch(
        content_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ContentTypeMismatch {
            content_type: content_type.into(),
            message: message.into(),
        }
    }

    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }

    pub fn process_launch(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessLaunch {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn process_timeout(command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::ProcessTimeout {
            command: command.into(),
            timeout_ms,
        }
    }

    pub fn process_exit(command: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ProcessExit {
            command: command.into(),
            exit_code,
        }
    }

    pub fn pattern_compile(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PatternCompile {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether a retry with a re-detected content type may succeed
    pub fn is_content_type_mismatch(&self) -> bool {
        matches!(self, Self::ContentTypeMismatch { .. })
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extraction { .. } => "extraction",
            Self::ContentTypeMismatch { .. } => "content_type_mismatch",
            Self::Handler { .. } => "handler",
            Self::ProcessLaunch { .. } => "process_launch",
            Self::ProcessTimeout { .. } => "timeout",
            Self::ProcessExit { .. } => "process_exit",
            Self::PatternCompile { .. } => "pattern_compile",
            Self::Io { .. } => "io",
            Self::Configuration { .. } => "configuration",
        }
    }
}

impl From<std::io::Error> for ImporterError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}
