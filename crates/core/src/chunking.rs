use crate::error::IngestError;
use crate::models::{Chunk, Fingerprint};
use std::collections::VecDeque;
use tracing::warn;

/// Paragraphs, then lines, then sentences, then words, then single characters.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ".", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            overlap: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Recursive character splitter. Lengths are counted in chars.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        Self::with_separators(config, &DEFAULT_SEPARATORS)
    }

    pub fn with_separators(config: ChunkingConfig, separators: &[&str]) -> Result<Self, IngestError> {
        config.validate()?;
        if separators.is_empty() {
            return Err(IngestError::InvalidChunkConfig(
                "at least one separator is required".to_string(),
            ));
        }
        Ok(Self {
            config,
            separators: separators.iter().map(|sep| (*sep).to_string()).collect(),
        })
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (position, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                finer = &separators[position + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_pieces(&pending));
                pending.clear();
            }

            if finer.is_empty() {
                if let Some(trimmed) = trimmed_non_empty(&piece) {
                    chunks.push(trimmed);
                }
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_pieces(&pending));
        }

        chunks
    }

    fn merge_pieces(&self, pieces: &[String]) -> Vec<String> {
        let ChunkingConfig {
            chunk_size,
            overlap,
        } = self.config;

        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > chunk_size {
                if total > chunk_size {
                    warn!(total, chunk_size, "created a chunk longer than the configured size");
                }

                if !window.is_empty() {
                    if let Some(chunk) = join_window(&window) {
                        merged.push(chunk);
                    }

                    // Keep at most `overlap` chars of tail, and make room for the incoming piece.
                    while total > overlap || (total + len > chunk_size && total > 0) {
                        match window.pop_front() {
                            Some(dropped) => total -= char_len(dropped),
                            None => break,
                        }
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_window(&window) {
            merged.push(chunk);
        }

        merged
    }
}

/// Splits a document's text into sequence-numbered chunks tied to its fingerprint.
pub fn chunk_document(
    splitter: &RecursiveSplitter,
    doc_hash: &Fingerprint,
    text: &str,
) -> Vec<Chunk> {
    splitter
        .split_text(text)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            doc_hash: doc_hash.clone(),
            chunk_id: index as u64,
            text,
        })
        .collect()
}

/// The separator stays attached to the start of the piece that follows it.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut parts = text.split(separator);
    let mut pieces = Vec::new();
    if let Some(first) = parts.next() {
        pieces.push(first.to_string());
    }
    pieces.extend(parts.map(|part| format!("{separator}{part}")));
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    trimmed_non_empty(&joined)
}

fn trimmed_non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    fn splitter(chunk_size: usize, overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(ChunkingConfig {
            chunk_size,
            overlap,
        })
        .expect("valid config")
    }

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|index| format!("w{index:03}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let text = "A short paragraph.\nWith two lines.";
        let chunks = RecursiveSplitter::new(ChunkingConfig::default())
            .unwrap()
            .split_text(text);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(splitter(100, 20).split_text("").is_empty());
        assert!(splitter(100, 20).split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let first = "a".repeat(60);
        let second = "b".repeat(60);
        let text = format!("{first}\n\n{second}");
        let chunks = splitter(100, 20).split_text(&text);
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn oversized_paragraph_falls_back_to_sentences() {
        let sentence = "x".repeat(40);
        let paragraph = format!("{sentence}.{sentence}.{sentence}");
        let chunks = splitter(100, 0).split_text(&paragraph);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{sentence}.{sentence}"));
        assert_eq!(chunks[1], format!(".{sentence}"));
    }

    #[test]
    fn unbroken_text_is_split_per_character_with_overlap() {
        let token: String = ('a'..='z').cycle().take(250).collect();
        let chunks = splitter(100, 20).split_text(&token);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], token[..100]);
        assert_eq!(chunks[1], token[80..180]);
        assert_eq!(chunks[2], token[160..]);
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = numbered_words(200);
        let chunks = splitter(50, 15).split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 50, "chunk too long: {chunk:?}");
        }
        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().unwrap_or_default();
            assert!(pair[0].contains(first_word), "no overlap between {pair:?}");
        }
    }

    #[test]
    fn removing_overlaps_reconstructs_the_text() {
        let text = numbered_words(300);
        let chunks = splitter(64, 16).split_text(&text);

        let mut rebuilt = String::new();
        let mut previous_end = 0usize;
        for chunk in &chunks {
            let start = text.find(chunk.as_str()).expect("chunk is a substring");
            assert!(start <= previous_end + 1, "gap before {chunk:?}");
            let end = start + chunk.len();
            if end > previous_end {
                rebuilt.push_str(&text[previous_end..end]);
                previous_end = end;
            }
        }

        assert_eq!(rebuilt, text);
    }

    #[test]
    fn output_is_deterministic() {
        let text = format!("{}\n\n{}", numbered_words(120), numbered_words(80));
        let splitter = splitter(90, 30);
        assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
    }

    #[test]
    fn multibyte_text_is_measured_in_chars() {
        let text = "é".repeat(30);
        let chunks = splitter(30, 5).split_text(&text);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let result = RecursiveSplitter::new(ChunkingConfig {
            chunk_size: 10,
            overlap: 10,
        });
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[test]
    fn document_chunks_are_numbered_and_tagged() {
        let hash = fingerprint(b"doc");
        let chunks = chunk_document(&splitter(50, 10), &hash, &numbered_words(40));
        assert!(chunks.len() > 1);
        for (index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, index as u64);
            assert_eq!(chunk.doc_hash, hash);
        }
    }
}
