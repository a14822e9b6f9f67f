//! Chunking strategy trait and types used by the chunk splitter

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::error::ImporterError;

/// Configuration for chunking, sizes in characters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Target chunk size
    pub chunk_size: usize,
    /// Overlap between consecutive chunks
    pub chunk_overlap: usize,
    /// Chunks shorter than this are merged into a neighbour
    pub min_chunk_size: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size: 0,
        }
    }

    pub fn with_min_chunk_size(mut self, min_size: usize) -> Self {
        self.min_chunk_size = min_size;
        self
    }

    pub fn validate(&self) -> Result<(), ImporterError> {
        if self.chunk_size == 0 {
            return Err(ImporterError::configuration(
                "chunk_size must be greater than 0",
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ImporterError::configuration(
                "chunk_overlap must be less than chunk_size",
            ));
        }

        if self.min_chunk_size > self.chunk_size {
            return Err(ImporterError::configuration(
                "min_chunk_size must be less than or equal to chunk_size",
            ));
        }

        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 0,
            min_chunk_size: 0,
        }
    }
}

/// Position of a chunk within its source text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Character offset where the chunk starts
    pub char_start: usize,
    /// Character offset where the chunk ends (exclusive)
    pub char_end: usize,
}

impl ChunkMetadata {
    pub fn new(chunk_index: usize, total_chunks: usize, char_start: usize, char_end: usize) -> Self {
        Self {
            chunk_index,
            total_chunks,
            char_start,
            char_end,
        }
    }
}

/// A chunk of text cut from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn index(&self) -> usize {
        self.metadata.chunk_index
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Trait for chunking strategies
pub trait ChunkingStrategy: Send + Sync + Debug {
    /// Split content into chunks
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ImporterError>;

    /// Get the strategy name
    fn name(&self) -> &'static str;
}

/// Helpers shared by the chunkers, all working on character positions
pub mod helpers {
    use super::{Chunk, ChunkMetadata};

    /// Nearest word boundary at or before `pos`, or `pos` when the word
    /// starts at `floor`
    pub fn find_word_boundary_before(chars: &[char], floor: usize, pos: usize) -> usize {
        if pos >= chars.len() {
            return chars.len();
        }

        let mut boundary = pos;
        while boundary > floor && !chars[boundary - 1].is_whitespace() {
            boundary -= 1;
        }

        if boundary == floor { pos } else { boundary }
    }

    /// Character count of a string
    pub fn char_len(text: &str) -> usize {
        text.chars().count()
    }

    /// Fill in `total_chunks` once all chunks are known
    pub fn finalize(chunks: &mut [Chunk]) {
        let total = chunks.len();
        for (index, chunk) in chunks.iter_mut().enumerate() {
            chunk.metadata.chunk_index = index;
            chunk.metadata.total_chunks = total;
        }
    }

    /// A single chunk covering the whole text
    pub fn whole(text: &str) -> Vec<Chunk> {
        vec![Chunk::new(text, ChunkMetadata::new(0, 1, 0, char_len(text)))]
    }

    /// Merge chunks shorter than `min_size` into their predecessor
    pub fn merge_small(chunks: Vec<Chunk>, min_size: usize, separator: &str) -> Vec<Chunk> {
        if min_size == 0 {
            return chunks;
        }

        let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match merged.last_mut() {
                Some(last) if char_len(&chunk.content) < min_size => {
                    last.content.push_str(separator);
                    last.content.push_str(&chunk.content);
                    last.metadata.char_end = chunk.metadata.char_end;
                }
                _ => merged.push(chunk),
            }
        }
        merged
    }
}
