//! Chunking strategies used by the chunk splitter

pub mod fixed_size;
pub mod paragraph;
pub mod sentence;

pub use fixed_size::FixedSizeChunker;
pub use paragraph::ParagraphChunker;
pub use sentence::SentenceChunker;

use crate::domain::chunker::{helpers, Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy};
use crate::domain::handler::ChunkStrategy;

/// Chunker for a configured strategy
pub fn chunker_for(strategy: ChunkStrategy) -> Box<dyn ChunkingStrategy> {
    match strategy {
        ChunkStrategy::FixedSize => Box::new(FixedSizeChunker::new()),
        ChunkStrategy::Sentence => Box::new(SentenceChunker::new()),
        ChunkStrategy::Paragraph => Box::new(ParagraphChunker::new()),
    }
}

/// A trimmed span of the source text, offsets in characters
#[derive(Debug, Clone, Copy)]
pub(crate) struct Unit<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Spans of `text` separated by `boundaries`, given as byte ranges
pub(crate) fn units_from_byte_spans<'a>(
    text: &'a str,
    spans: impl Iterator<Item = (usize, usize)>,
) -> Vec<Unit<'a>> {
    let mut units = Vec::new();
    let mut byte_cursor = 0;
    let mut char_cursor = 0;

    for (from, to) in spans {
        let raw = &text[from..to];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        char_cursor += helpers::char_len(&text[byte_cursor..from]);
        let leading = helpers::char_len(&raw[..raw.len() - raw.trim_start().len()]);
        let start = char_cursor + leading;
        let end = start + helpers::char_len(trimmed);

        char_cursor += helpers::char_len(raw);
        byte_cursor = to;
        units.push(Unit { text: trimmed, start, end });
    }

    units
}

/// Pack units into chunks of at most `chunk_size` characters
///
/// Units longer than a chunk are cut with the fixed-size chunker.
/// Overlap carries whole trailing units into the next chunk.
pub(crate) fn pack(units: &[Unit<'_>], config: &ChunkingConfig, separator: &str) -> Vec<Chunk> {
    let sep_len = helpers::char_len(separator);
    let mut chunks = Vec::new();
    let mut current: Vec<Unit<'_>> = Vec::new();
    let mut current_len = 0;

    let flush = |current: &[Unit<'_>], chunks: &mut Vec<Chunk>| {
        if let (Some(first), Some(last)) = (current.first(), current.last()) {
            let text = current
                .iter()
                .map(|u| u.text)
                .collect::<Vec<_>>()
                .join(separator);
            chunks.push(Chunk::new(text, ChunkMetadata::new(0, 0, first.start, last.end)));
        }
    };

    for unit in units {
        let len = helpers::char_len(unit.text);

        if len > config.chunk_size {
            flush(&current, &mut chunks);
            current.clear();
            current_len = 0;

            for mut piece in FixedSizeChunker::new().split(unit.text, config) {
                piece.metadata.char_start += unit.start;
                piece.metadata.char_end += unit.start;
                chunks.push(piece);
            }
            continue;
        }

        let joined = |current_len: usize| {
            if current_len == 0 {
                len
            } else {
                current_len + sep_len + len
            }
        };

        if !current.is_empty() && joined(current_len) > config.chunk_size {
            flush(&current, &mut chunks);

            let mut kept: Vec<Unit<'_>> = Vec::new();
            let mut kept_len = 0;
            for previous in current.iter().rev() {
                let previous_len = helpers::char_len(previous.text);
                let with = if kept.is_empty() {
                    previous_len
                } else {
                    kept_len + sep_len + previous_len
                };
                if with > config.chunk_overlap {
                    break;
                }
                kept.insert(0, *previous);
                kept_len = with;
            }

            if joined(kept_len) > config.chunk_size {
                kept.clear();
                kept_len = 0;
            }
            current = kept;
            current_len = kept_len;
        }

        current_len = joined(current_len);
        current.push(*unit);
    }

    flush(&current, &mut chunks);
    helpers::finalize(&mut chunks);
    chunks
}
