//! Deterministic fixed-size partitioning of the corpus.
//!
//! The summarization endpoint has a bounded input window, so the accumulated corpus is
//! split into chunks of at most `max_chunk_size` characters before summarization. The
//! partition covers every character exactly once: no overlap, no gap, no silent
//! truncation. Splitting is purely size-based; boundaries fall wherever the count lands.

use super::types::ChunkingError;

/// Split `text` into an ordered sequence of chunks of at most `max_chunk_size` characters.
///
/// Counts characters rather than bytes so multibyte input never splits mid-codepoint.
/// Produces ⌈len/max_chunk_size⌉ chunks whose concatenation reproduces the input exactly;
/// empty input yields an empty vector.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Result<Vec<String>, ChunkingError> {
    if max_chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == max_chunk_size {
            chunks.push(text[start..offset].to_string());
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_without_overlap_or_gap() {
        let text = "abcdefghij";
        let chunks = chunk_text(text, 3).expect("chunking succeeded");
        assert_eq!(chunks, vec!["abc", "def", "ghi", "j"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn produces_ceil_len_over_size_chunks() {
        for (len, size, expected) in [(10, 3, 4), (9, 3, 3), (1, 2000, 1), (2000, 2000, 1)] {
            let text: String = "x".repeat(len);
            let chunks = chunk_text(&text, size).expect("chunking succeeded");
            assert_eq!(chunks.len(), expected, "len={len} size={size}");
            assert_eq!(chunks.concat(), text);
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "héllo wörld";
        let chunks = chunk_text(text, 4).expect("chunking succeeded");
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 4);
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = chunk_text("", 100).expect("chunking succeeded");
        assert!(chunks.is_empty());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let error = chunk_text("hello", 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }
}
