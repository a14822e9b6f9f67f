//! Sentence-based chunking strategy

use unicode_segmentation::UnicodeSegmentation;

use super::{pack, units_from_byte_spans};
use crate::domain::chunker::{helpers, Chunk, ChunkingConfig, ChunkingStrategy};
use crate::domain::ImporterError;

/// Packs whole sentences into chunks
#[derive(Debug, Clone, Default)]
pub struct SentenceChunker;

impl SentenceChunker {
    pub fn new() -> Self {
        Self
    }
}

impl ChunkingStrategy for SentenceChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ImporterError> {
        config.validate()?;

        let spans = content
            .split_sentence_bound_indices()
            .map(|(offset, sentence)| (offset, offset + sentence.len()));
        let units = units_from_byte_spans(content, spans);

        let mut chunks = helpers::merge_small(pack(&units, config, " "), config.min_chunk_size, " ");
        helpers::finalize(&mut chunks);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "sentence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentences_packed() {
        let text = "First sentence. Second one here. Third is last.";
        let chunks = SentenceChunker::new()
            .chunk(text, &ChunkingConfig::new(35, 0))
            .unwrap();

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["First sentence. Second one here.", "Third is last."]);
        assert_eq!(chunks[1].metadata.char_start, 33);
    }

    #[test]
    fn test_fits_in_one_chunk() {
        let chunks = SentenceChunker::new()
            .chunk("  One. Two.  ", &ChunkingConfig::new(100, 0))
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "One. Two.");
        assert_eq!(chunks[0].metadata.char_start, 2);
    }

    #[test]
    fn test_empty() {
        assert!(SentenceChunker::new().chunk(" ", &ChunkingConfig::default()).unwrap().is_empty());
    }
}
