//! Paragraph-based chunking strategy

use once_cell::sync::Lazy;
use regex::Regex;

use super::{pack, units_from_byte_spans};
use crate::domain::chunker::{helpers, Chunk, ChunkingConfig, ChunkingStrategy};
use crate::domain::ImporterError;

/// One or more blank lines
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\r?\n[ \t]*){2,}").unwrap());

/// Packs whole paragraphs into chunks
#[derive(Debug, Clone, Default)]
pub struct ParagraphChunker;

impl ParagraphChunker {
    pub fn new() -> Self {
        Self
    }

    fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut start = 0;
        for separator in PARAGRAPH_BREAK.find_iter(text) {
            spans.push((start, separator.start()));
            start = separator.end();
        }
        spans.push((start, text.len()));
        spans
    }
}

impl ChunkingStrategy for ParagraphChunker {
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ImporterError> {
        config.validate()?;

        let units = units_from_byte_spans(content, Self::paragraph_spans(content).into_iter());

        let mut chunks =
            helpers::merge_small(pack(&units, config, "\n\n"), config.min_chunk_size, "\n\n");
        helpers::finalize(&mut chunks);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "paragraph"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_become_chunks() {
        let text = "First paragraph.\n\nSecond paragraph.\n  \n\nThird.";
        let chunks = ParagraphChunker::new()
            .chunk(text, &ChunkingConfig::new(20, 0))
            .unwrap();

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["First paragraph.", "Second paragraph.", "Third."]);
        assert_eq!(chunks[1].metadata.char_start, 18);
    }

    #[test]
    fn test_small_paragraphs_share_a_chunk() {
        let chunks = ParagraphChunker::new()
            .chunk("a\n\nb\n\nc", &ChunkingConfig::new(100, 0))
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "a\n\nb\n\nc");
    }

    #[test]
    fn test_min_chunk_size_merges_tail() {
        let chunks = ParagraphChunker::new()
            .chunk(
                "long paragraph one\n\nx",
                &ChunkingConfig::new(18, 0).with_min_chunk_size(5),
            )
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "long paragraph one\n\nx");
    }
}
