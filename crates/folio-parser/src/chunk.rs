//! Fixed-size word chunking and the chunk file
//!
//! Chunks never overlap. The last chunk keeps whatever words remain, so
//! `n` words at chunk size `c` always produce `ceil(n / c)` chunks.

use std::path::Path;

use folio_core::Chunk;

use crate::{ParserError, Result};

/// Words per chunk when nothing else is configured
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Split text into chunks of `chunk_size` whitespace-separated words.
///
/// Ids are assigned in reading order starting at `chunk-1`. Empty or
/// whitespace-only input yields no chunks.
pub fn chunk_words(text: &str, chunk_size: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(ParserError::InvalidChunkSize);
    }

    let words: Vec<&str> = text.split_whitespace().collect();

    let chunks = words
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, group)| Chunk::new(format!("chunk-{}", i + 1), group.join(" ")))
        .collect();

    Ok(chunks)
}

/// Write chunks as a pretty-printed JSON array
pub fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    let json = serde_json::to_string_pretty(chunks).map_err(|e| ParserError::ChunkFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ParserError::IoError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    std::fs::write(path, json).map_err(|e| ParserError::IoError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Read a chunk file written by [`write_chunks`]
pub fn read_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let content = std::fs::read_to_string(path).map_err(|e| ParserError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| ParserError::ChunkFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sequential_ids_and_sizes() {
        let text = (1..=450).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = chunk_words(&text, 200).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "chunk-1");
        assert_eq!(chunks[2].id, "chunk-3");
        assert_eq!(chunks[0].word_count(), 200);
        assert_eq!(chunks[1].word_count(), 200);
        // Trailing partial chunk is kept as-is
        assert_eq!(chunks[2].word_count(), 50);
        assert!(chunks[1].text.starts_with("w201 "));
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let chunks = chunk_words("  Skilled\tin\n\nReact   and Node \n", 3).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Skilled in React");
        assert_eq!(chunks[1].text, "and Node");
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_words("", 200).unwrap().is_empty());
        assert!(chunk_words(" \n\t ", 200).unwrap().is_empty());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            chunk_words("some words", 0),
            Err(ParserError::InvalidChunkSize)
        ));
    }

    #[test]
    fn test_chunk_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Data").join("Resume.json");
        let chunks = vec![
            Chunk::new("chunk-1", "Skilled in React and Node"),
            Chunk::new("chunk-2", "Built FixMyIoT"),
        ];

        write_chunks(&path, &chunks).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"id\": \"chunk-1\""));

        assert_eq!(read_chunks(&path).unwrap(), chunks);
    }

    #[test]
    fn test_malformed_chunk_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Resume.json");
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();

        assert!(matches!(
            read_chunks(&path),
            Err(ParserError::ChunkFile { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_chunk_count_and_content(
            words in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 0..600),
            chunk_size in 1usize..250,
        ) {
            let text = words.join(" ");
            let chunks = chunk_words(&text, chunk_size).unwrap();

            prop_assert_eq!(chunks.len(), words.len().div_ceil(chunk_size));
            for chunk in &chunks {
                prop_assert!(chunk.word_count() <= chunk_size);
                prop_assert!(chunk.word_count() > 0);
            }

            let rejoined = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
            prop_assert_eq!(rejoined, words.join(" "));
        }

        #[test]
        fn prop_arbitrary_whitespace(text in "[a-z \\t\\n]{0,400}", chunk_size in 1usize..40) {
            let chunks = chunk_words(&text, chunk_size).unwrap();
            let expected = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let rejoined = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
            prop_assert_eq!(rejoined, expected);
        }
    }
}
