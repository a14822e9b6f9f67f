//! Fixed-size chunking strategy

use crate::domain::chunker::{helpers, Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
use crate::domain::ImporterError;

/// Splits text into chunks of at most `chunk_size` characters
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    /// Cut at whitespace when possible
    respect_word_boundaries: bool,
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedSizeChunker {
    pub fn new() -> Self {
        Self {
            respect_word_boundaries: true,
        }
    }

    pub fn with_word_boundaries(mut self, respect: bool) -> Self {
        self.respect_word_boundaries = respect;
        self
    }

    fn find_chunk_end(&self, chars: &[char], start: usize, target_end: usize) -> usize {
        if !self.respect_word_boundaries || target_end >= chars.len() {
            return target_end.min(chars.len());
        }
        helpers::find_word_boundary_before(chars, start, target_end)
    }

    /// Split without validating the configuration
    pub(crate) fn split(&self, content: &str, config: &ChunkingConfig) -> Vec<Chunk> {
        let chars: Vec<char> = content.chars().collect();
        if chars.iter().all(|c| c.is_whitespace()) {
            return Vec::new();
        }
        if chars.len() <= config.chunk_size {
            return helpers::whole(content);
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let target_end = (start + config.chunk_size).min(chars.len());
            let end = self.find_chunk_end(&chars, start, target_end);

            let piece: String = chars[start..end].iter().collect();
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(Chunk::new(trimmed, ChunkMetadata::new(0, 0, start, end)));
            }

            if end >= chars.len() {
                break;
            }

            let next = end.saturating_sub(config.chunk_overlap);
            start = if next <= start { end } else { next };
        }

        helpers::finalize(&mut chunks);
        chunks
    }
}

impl ChunkingStrategy for FixedSizeChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ImporterError> {
        config.validate()?;

        let mut chunks = helpers::merge_small(self.split(content, config), config.min_chunk_size, " ");
        helpers::finalize(&mut chunks);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "fixed_size"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace() {
        let chunker = FixedSizeChunker::new();
        let config = ChunkingConfig::default();

        assert!(chunker.chunk("", &config).unwrap().is_empty());
        assert!(chunker.chunk("   \n\t  ", &config).unwrap().is_empty());
    }

    #[test]
    fn test_small_content_is_one_chunk() {
        let chunks = FixedSizeChunker::new()
            .chunk("Hello, World!", &ChunkingConfig::new(100, 0))
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, World!");
        assert_eq!(chunks[0].metadata.total_chunks, 1);
    }

    #[test]
    fn test_word_boundaries() {
        let chunks = FixedSizeChunker::new()
            .chunk("alpha beta gamma delta", &ChunkingConfig::new(12, 0))
            .unwrap();

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["alpha beta", "gamma delta"]);
        assert_eq!(chunks[1].metadata.char_start, 11);
        assert_eq!(chunks[1].metadata.total_chunks, 2);
    }

    #[test]
    fn test_overlap() {
        let chunks = FixedSizeChunker::new()
            .with_word_boundaries(false)
            .chunk("abcdefghij", &ChunkingConfig::new(4, 2))
            .unwrap();

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "cdef", "efgh", "ghij"]);
    }

    #[test]
    fn test_multibyte_characters() {
        let chunks = FixedSizeChunker::new()
            .with_word_boundaries(false)
            .chunk("ééééé", &ChunkingConfig::new(2, 0))
            .unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].content, "é");
        assert_eq!(chunks[2].metadata.char_start, 4);
    }
}
