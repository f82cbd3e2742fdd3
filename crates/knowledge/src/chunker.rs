//! Word-window chunking of record bodies.

use crate::types::{Chunk, CorpusRecord};
use std::str::SplitWhitespace;

/// Default maximum number of whitespace-delimited tokens per chunk.
pub const DEFAULT_MAX_TOKENS: usize = 200;

/// Lazy iterator of non-overlapping word windows over a text.
///
/// Each item holds at most `max_tokens` tokens joined by single spaces. The
/// iterator is `Clone`, so a sequence can be restarted from any point.
#[derive(Debug, Clone)]
pub struct WordChunks<'a> {
    words: SplitWhitespace<'a>,
    max_tokens: usize,
}

impl<'a> Iterator for WordChunks<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let first = self.words.next()?;
        let mut chunk = String::from(first);
        for word in self.words.by_ref().take(self.max_tokens - 1) {
            chunk.push(' ');
            chunk.push_str(word);
        }
        Some(chunk)
    }
}

/// Split `text` into chunks of at most `max_tokens` whitespace tokens.
///
/// Empty or whitespace-only input yields nothing; `max_tokens == 0` is
/// treated as 1.
pub fn chunk_words(text: &str, max_tokens: usize) -> WordChunks<'_> {
    WordChunks {
        words: text.split_whitespace(),
        max_tokens: max_tokens.max(1),
    }
}

/// Chunk a record's body, numbering chunks from zero.
pub fn chunk_record(record: &CorpusRecord, max_tokens: usize) -> impl Iterator<Item = Chunk> + '_ {
    chunk_words(&record.body, max_tokens)
        .enumerate()
        .map(move |(position, text)| Chunk {
            position: position as u32,
            source: record.source.clone(),
            text,
        })
}
