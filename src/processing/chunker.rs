//! Section chunking.
//!
//! Documentation sections above the configured maximum are split along
//! paragraph boundaries, and oversize paragraphs along sentence boundaries.
//! Units are packed greedily; each emitted sub-chunk copies the parent's
//! metadata and carries a 0-based `chunk_index`. Functions, methods,
//! classes, and modules are never chunked.

use crate::config::DEFAULT_SECTION_CHUNK_MAX_CHARS;
use crate::core::{Chunk, ChunkKind};

/// Splits oversize documentation sections into smaller retrievable pieces.
///
/// # Examples
///
/// ```
/// use code_cognitio::processing::SectionChunker;
///
/// let chunker = SectionChunker::new(100);
/// assert_eq!(chunker.max_chunk_size(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct SectionChunker {
    max_chunk_size: usize,
}

impl SectionChunker {
    /// Creates a chunker with the given maximum section length.
    #[must_use]
    pub const fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    /// Returns the maximum chunk size in characters.
    #[must_use]
    pub const fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Applies section splitting across a chunk list, leaving non-section
    /// chunks untouched.
    #[must_use]
    pub fn chunk_all(&self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        let mut result = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk.kind() == ChunkKind::Section && chunk.raw_text.len() > self.max_chunk_size {
                result.extend(self.split_section(chunk));
            } else {
                result.push(chunk);
            }
        }
        result
    }

    /// Splits one section into packed sub-chunks.
    fn split_section(&self, section: Chunk) -> Vec<Chunk> {
        let units = self.split_into_units(&section.raw_text);

        let mut chunks = Vec::new();
        let mut current = String::new();

        for unit in units {
            let joined_len = if current.is_empty() {
                unit.len()
            } else {
                current.len() + 2 + unit.len()
            };

            if joined_len > self.max_chunk_size && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if current.is_empty() {
                current = unit;
            } else {
                current.push_str("\n\n");
                current.push_str(&unit);
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let mut sub = section.clone();
                sub.raw_text = text;
                sub.chunk_index = Some(index);
                sub
            })
            .collect()
    }

    /// Splits text into paragraphs, breaking oversize paragraphs into
    /// sentence groups.
    fn split_into_units(&self, text: &str) -> Vec<String> {
        let paragraphs = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let mut units = Vec::new();
        for paragraph in paragraphs {
            if paragraph.len() <= self.max_chunk_size {
                units.push(paragraph.to_string());
                continue;
            }

            let mut current = String::new();
            for sentence in split_sentences(paragraph) {
                let joined_len = if current.is_empty() {
                    sentence.len()
                } else {
                    current.len() + 1 + sentence.len()
                };
                if joined_len > self.max_chunk_size && !current.is_empty() {
                    units.push(std::mem::take(&mut current));
                }
                if current.is_empty() {
                    current = sentence.to_string();
                } else {
                    current.push(' ');
                    current.push_str(sentence);
                }
            }
            if !current.is_empty() {
                units.push(current);
            }
        }
        units
    }
}

impl Default for SectionChunker {
    fn default() -> Self {
        Self::new(DEFAULT_SECTION_CHUNK_MAX_CHARS)
    }
}

/// Splits on sentence-ending punctuation followed by whitespace and an
/// uppercase letter.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.char_indices().collect::<Vec<_>>();

    let mut i = 0;
    while i < bytes.len() {
        let (_, c) = bytes[i];
        if matches!(c, '.' | '!' | '?') {
            // Consume the whitespace run after the punctuation.
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].1.is_whitespace() {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j].1.is_uppercase() {
                let (end, _) = bytes[i + 1];
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = bytes[j].0;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
