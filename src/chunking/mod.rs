//! Transcript chunking.
//!
//! Splits transcript text into fixed-width retrievable segments.

use crate::error::{Result, SvarError};

/// Build the deterministic id for a chunk of a media item.
///
/// Re-ingesting the same item therefore overwrites the same store entries
/// instead of duplicating them.
pub fn chunk_id(media_id: &str, index: u32) -> String {
    format!("{}_chunk_{}", media_id, index)
}

/// Split `text` into consecutive slices of `size` characters.
///
/// Every chunk is exactly `size` characters long except possibly the last.
/// Chunks do not overlap and boundaries ignore word and sentence structure,
/// so concatenating the result in order reproduces `text` exactly. Empty
/// input yields no chunks. Sizes are counted in Unicode scalar values, never
/// splitting inside a code point.
pub fn chunk_text(text: &str, size: usize) -> Result<Vec<String>> {
    if size == 0 {
        return Err(SvarError::Config(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    Ok(chars
        .chunks(size)
        .map(|slice| slice.iter().collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_determinism() {
        assert_eq!(chunk_id("42", 3), "42_chunk_3");
        assert_eq!(chunk_id("42", 3), chunk_id("42", 3));
    }

    #[test]
    fn test_concatenation_reconstructs_input() {
        let text = "The quick brown fox jumps over the lazy dog";
        for size in [1, 3, 7, 44, 100] {
            let chunks = chunk_text(text, size).unwrap();
            assert_eq!(chunks.concat(), text, "size {}", size);
        }
    }

    #[test]
    fn test_all_chunks_full_size_except_last() {
        let text = "abcdefghij";
        let chunks = chunk_text(text, 3).unwrap();
        assert_eq!(chunks, vec!["abc", "def", "ghi", "j"]);
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.chars().count(), 3);
        }
    }

    #[test]
    fn test_exact_multiple_has_no_short_tail() {
        let chunks = chunk_text("abcdef", 3).unwrap();
        assert_eq!(chunks, vec!["abc", "def"]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunks = chunk_text("", 500).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_zero_size_is_an_error() {
        assert!(chunk_text("anything", 0).is_err());
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "héllo wörld, påskeegg";
        let chunks = chunk_text(text, 4).unwrap();
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 4);
        }
    }
}
