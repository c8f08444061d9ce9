//! Recursive character text splitting
//!
//! Splits page text on progressively finer separators (paragraph, line,
//! word, character) and greedily merges the pieces back into chunks of at
//! most `chunk_size` characters, carrying up to `chunk_overlap` characters
//! of trailing context into the next chunk. Sizes are measured in characters,
//! not bytes, so accented text chunks the same as plain ASCII.

use std::collections::VecDeque;

use super::parser::ParsedPdf;
use crate::types::{ChunkMetadata, DocumentChunk};

/// Separator cascade, coarsest first
const SEPARATORS: &[&str] = &["\n\n", "\n", " "];

/// Text splitter with configurable size and overlap
pub struct TextSplitter {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a new splitter
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split a parsed PDF into chunks, page by page
    ///
    /// Chunks never span page boundaries; the chunk index is global across
    /// the whole document.
    pub fn split_document(&self, pdf: &ParsedPdf) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        let mut chunk_index = 0u32;

        for page in &pdf.pages {
            for content in self.split_text(&page.content) {
                chunks.push(DocumentChunk {
                    content,
                    metadata: ChunkMetadata {
                        source: pdf.filename.clone(),
                        page: Some(page.page_number),
                        chunk_index,
                    },
                });
                chunk_index += 1;
            }
        }

        chunks
    }

    /// Split raw text into chunks of at most `chunk_size` characters
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let atoms = self.atomize(text, SEPARATORS);
        self.merge_atoms(atoms)
    }

    /// Break text into pieces no larger than `chunk_size`, preferring the
    /// coarsest separator that produces small enough pieces
    fn atomize(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        match separators.split_first() {
            Some((separator, rest)) => {
                let mut atoms = Vec::new();
                for piece in split_keeping_separator(text, separator) {
                    if char_len(piece) <= self.chunk_size {
                        atoms.push(piece.to_string());
                    } else {
                        atoms.extend(self.atomize(piece, rest));
                    }
                }
                atoms
            }
            None => self.hard_split(text),
        }
    }

    /// Cut a run with no usable separator into fixed-size character pieces
    ///
    /// Pieces are overlap-sized so the merge pass can still carry context
    /// between the chunks built from them.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let piece_size = if self.chunk_overlap > 0 {
            self.chunk_overlap
        } else {
            self.chunk_size.max(1)
        };

        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut count = 0usize;

        for ch in text.chars() {
            current.push(ch);
            count += 1;
            if count == piece_size {
                pieces.push(std::mem::take(&mut current));
                count = 0;
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }

        pieces
    }

    /// Greedily merge atoms into chunks, carrying a tail of at most
    /// `chunk_overlap` characters into the following chunk
    fn merge_atoms(&self, atoms: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(String, usize)> = VecDeque::new();
        let mut window_len = 0usize;

        for atom in atoms {
            let atom_len = char_len(&atom);

            if window_len + atom_len > self.chunk_size && !window.is_empty() {
                push_chunk(&mut chunks, &window);

                // Shrink the window to the overlap budget, and further if the
                // incoming atom still would not fit.
                while window_len > self.chunk_overlap
                    || (window_len + atom_len > self.chunk_size && window_len > 0)
                {
                    match window.pop_front() {
                        Some((_, len)) => window_len -= len,
                        None => break,
                    }
                }
            }

            window_len += atom_len;
            window.push_back((atom, atom_len));
        }

        push_chunk(&mut chunks, &window);
        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` at `separator`, keeping each separator attached to the end
/// of the piece before it, so that concatenating the pieces reproduces the
/// input exactly
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for (index, matched) in text.match_indices(separator) {
        let end = index + matched.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<(String, usize)>) {
    let joined: String = window.iter().map(|(atom, _)| atom.as_str()).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::parser::PageText;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|i| format!("word{:03}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::new(1000, 150);
        let chunks = splitter.split_text("A short paragraph that fits easily.");
        assert_eq!(chunks, vec!["A short paragraph that fits easily.".to_string()]);
    }

    #[test]
    fn test_empty_and_whitespace_produce_no_chunks() {
        let splitter = TextSplitter::new(1000, 150);
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n \t ").is_empty());
    }

    #[test]
    fn test_splits_at_paragraph_boundary() {
        let first = "a".repeat(800);
        let second = "b".repeat(800);
        let text = format!("{}\n\n{}", first, second);

        let splitter = TextSplitter::new(1000, 150);
        let chunks = splitter.split_text(&text);

        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn test_chunks_never_exceed_chunk_size() {
        let text = numbered_words(400);
        let splitter = TextSplitter::new(100, 20);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "oversized chunk: {}", chunk);
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = numbered_words(200);
        let splitter = TextSplitter::new(100, 20);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            // The words are unique, so a repeated leading word proves carry
            let first_word = pair[1].split_whitespace().next().unwrap();
            assert!(
                pair[0].contains(first_word),
                "chunk {:?} does not carry into {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_hard_split_of_unbroken_run() {
        let run = "x".repeat(2500);
        let splitter = TextSplitter::new(1000, 150);
        let chunks = splitter.split_text(&run);

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
    }

    #[test]
    fn test_multibyte_text_counts_chars_not_bytes() {
        // Two bytes per character; byte-based splitting would either cut
        // mid-character or halve the chunk capacity
        let text = "ã".repeat(1500);
        let splitter = TextSplitter::new(1000, 150);
        let chunks = splitter.split_text(&text);

        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert!(total >= 1500);
    }

    #[test]
    fn test_split_document_tracks_pages_and_indices() {
        let pdf = ParsedPdf {
            filename: "manual.pdf".to_string(),
            total_pages: 2,
            pages: vec![
                PageText {
                    page_number: 1,
                    content: "First page text.".to_string(),
                },
                PageText {
                    page_number: 2,
                    content: "Second page text.".to_string(),
                },
            ],
        };

        let splitter = TextSplitter::new(1000, 150);
        let chunks = splitter.split_document(&pdf);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "First page text.");
        assert_eq!(chunks[0].metadata.source, "manual.pdf");
        assert_eq!(chunks[0].metadata.page, Some(1));
        assert_eq!(chunks[0].metadata.chunk_index, 0);
        assert_eq!(chunks[1].metadata.page, Some(2));
        assert_eq!(chunks[1].metadata.chunk_index, 1);
    }

    #[test]
    fn test_long_page_keeps_page_number_across_chunks() {
        let pdf = ParsedPdf {
            filename: "manual.pdf".to_string(),
            total_pages: 1,
            pages: vec![PageText {
                page_number: 1,
                content: numbered_words(300),
            }],
        };

        let splitter = TextSplitter::new(100, 20);
        let chunks = splitter.split_document(&pdf);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.page, Some(1));
            assert_eq!(chunk.metadata.chunk_index, i as u32);
        }
    }
}
