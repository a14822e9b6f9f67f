//! Splitters producing child documents

use serde::{Deserialize, Serialize};

use crate::domain::chunker::ChunkingConfig;
use crate::domain::ImporterError;

/// How a chunk splitter cuts text
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    #[default]
    FixedSize,
    Sentence,
    Paragraph,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

/// Splits text content into one child document per chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSplitter {
    #[serde(default)]
    pub strategy: ChunkStrategy,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub chunk_overlap: usize,

    #[serde(default)]
    pub min_chunk_size: usize,

    /// Copy the parent's metadata onto every child
    #[serde(default = "default_true")]
    pub inherit_metadata: bool,
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::FixedSize,
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            min_chunk_size: 0,
            inherit_metadata: true,
        }
    }
}

impl ChunkSplitter {
    pub fn new(strategy: ChunkStrategy, chunk_size: usize) -> Self {
        Self {
            strategy,
            chunk_size,
            ..Self::default()
        }
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    pub fn with_inherit_metadata(mut self, inherit: bool) -> Self {
        self.inherit_metadata = inherit;
        self
    }

    pub fn chunking_config(&self) -> ChunkingConfig {
        ChunkingConfig::new(self.chunk_size, self.chunk_overlap)
            .with_min_chunk_size(self.min_chunk_size)
    }
}

/// Splitter variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitterHandler {
    Chunk(ChunkSplitter),
}

impl SplitterHandler {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Chunk(_) => "chunk",
        }
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        match self {
            Self::Chunk(splitter) => splitter.chunking_config().validate(),
        }
    }
}

impl From<ChunkSplitter> for SplitterHandler {
    fn from(splitter: ChunkSplitter) -> Self {
        Self::Chunk(splitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_config() {
        let splitter: SplitterHandler =
            serde_json::from_value(serde_json::json!({"type": "chunk", "strategy": "sentence"}))
                .unwrap();

        let SplitterHandler::Chunk(chunk) = &splitter;
        assert_eq!(chunk.strategy, ChunkStrategy::Sentence);
        assert_eq!(chunk.chunk_size, 1000);
        assert!(chunk.inherit_metadata);
        assert!(splitter.validate().is_ok());
    }

    #[test]
    fn test_invalid_overlap() {
        let splitter = SplitterHandler::from(ChunkSplitter::new(ChunkStrategy::FixedSize, 10).with_overlap(10));
        assert!(splitter.validate().is_err());
    }
}
