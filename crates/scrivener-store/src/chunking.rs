//! Splitting document text into retrievable fragments

use serde::{Deserialize, Serialize};

/// Text chunking strategy for documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Split by paragraphs (blank lines)
    #[default]
    ByParagraph,
    /// Split by sections (markdown headers or numbered clauses)
    BySection,
    /// Split by sentence, packing up to the size limit
    BySentence,
}

/// Chunks text according to the configured strategy
pub struct TextChunker {
    strategy: ChunkStrategy,
    max_chunk_size: usize,
}

impl TextChunker {
    /// Create a new text chunker; `max_chunk_size` is measured in characters
    pub fn new(strategy: ChunkStrategy, max_chunk_size: usize) -> Self {
        Self {
            strategy,
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    /// Chunk the given text
    ///
    /// Returns no chunks for blank text. Text within the limit comes back as a
    /// single trimmed chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if char_len(trimmed) <= self.max_chunk_size {
            return vec![trimmed.to_string()];
        }

        match self.strategy {
            ChunkStrategy::ByParagraph => self.chunk_by_paragraph(trimmed),
            ChunkStrategy::BySection => self.chunk_by_section(trimmed),
            ChunkStrategy::BySentence => self.chunk_by_sentence(trimmed),
        }
    }

    fn chunk_by_paragraph(&self, text: &str) -> Vec<String> {
        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        self.combine_until_limit(paragraphs, "\n\n")
    }

    fn chunk_by_section(&self, text: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current_section = String::new();

        for line in text.lines() {
            let start = line.trim_start();
            // "# Heading" or "12. Clause"
            let is_section_header = start.starts_with('#')
                || (start.chars().next().is_some_and(|c| c.is_ascii_digit())
                    && start
                        .split_once('.')
                        .is_some_and(|(num, _)| num.chars().all(|c| c.is_ascii_digit())));

            if is_section_header && !current_section.trim().is_empty() {
                sections.push(current_section.trim().to_string());
                current_section.clear();
            }

            current_section.push_str(line);
            current_section.push('\n');
        }

        if !current_section.trim().is_empty() {
            sections.push(current_section.trim().to_string());
        }

        if sections.len() <= 1 {
            self.chunk_by_paragraph(text)
        } else {
            self.combine_until_limit(sections, "\n\n")
        }
    }

    fn chunk_by_sentence(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;
        for (idx, c) in text.char_indices() {
            if matches!(c, '.' | '!' | '?') {
                let end = idx + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }

        self.combine_until_limit(sentences, " ")
    }

    /// Pack elements into chunks no longer than the limit
    fn combine_until_limit<S: AsRef<str>>(&self, elements: Vec<S>, separator: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current_chunk = String::new();

        for element in elements {
            let element_str = element.as_ref();
            let needed = if current_chunk.is_empty() {
                char_len(element_str)
            } else {
                char_len(&current_chunk) + separator.len() + char_len(element_str)
            };

            if needed <= self.max_chunk_size {
                if !current_chunk.is_empty() {
                    current_chunk.push_str(separator);
                }
                current_chunk.push_str(element_str);
                continue;
            }

            if !current_chunk.is_empty() {
                chunks.push(std::mem::take(&mut current_chunk));
            }

            if char_len(element_str) > self.max_chunk_size {
                chunks.extend(split_at_char_limit(element_str, self.max_chunk_size));
            } else {
                current_chunk.push_str(element_str);
            }
        }

        if !current_chunk.is_empty() {
            chunks.push(current_chunk);
        }

        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split text into pieces of at most `limit` characters
fn split_at_char_limit(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|piece| piece.iter().collect::<String>())
        .collect()
}
