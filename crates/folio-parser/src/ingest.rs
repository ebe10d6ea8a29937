//! Résumé ingestion: documents in, chunks out
//!
//! A source is either one file or a directory. In a directory every
//! supported file is read in file-name order and their texts are joined
//! with newlines before chunking. Files that fail to parse are logged and
//! skipped; ingestion only fails when nothing usable remains.

use std::path::{Path, PathBuf};

use folio_core::Chunk;

use crate::chunk::chunk_words;
use crate::{ParserError, ParserRegistry, Result};

/// Outcome of an ingestion run
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Chunks produced, in reading order
    pub chunks: Vec<Chunk>,

    /// Files whose text was used
    pub files_read: Vec<PathBuf>,

    /// Files that could not be parsed, with the reason
    pub files_skipped: Vec<(PathBuf, String)>,

    /// Total words across all chunks
    pub word_count: usize,
}

/// Extract text from `source` and split it into chunks of `chunk_size` words
pub fn ingest(source: &Path, chunk_size: usize) -> Result<IngestReport> {
    let registry = ParserRegistry::with_defaults();
    let files = collect_files(source, &registry)?;

    let mut all_text = String::new();
    let mut files_read = Vec::new();
    let mut files_skipped = Vec::new();

    for file in files {
        tracing::info!("Reading: {}", file.display());
        match registry.parse(&file) {
            Ok(doc) if doc.has_text() => {
                all_text.push('\n');
                all_text.push_str(&doc.content);
                files_read.push(file);
            }
            Ok(_) => {
                tracing::warn!("No text in {}", file.display());
                files_skipped.push((file, "no extractable text".to_string()));
            }
            Err(e) => {
                tracing::error!("Error reading {}: {}", file.display(), e);
                files_skipped.push((file, e.to_string()));
            }
        }
    }

    let chunks = chunk_words(&all_text, chunk_size)?;
    if chunks.is_empty() {
        return Err(ParserError::NoText(source.display().to_string()));
    }

    let word_count = chunks.iter().map(Chunk::word_count).sum();
    tracing::info!(
        "Created {} chunks ({} words) from {} files",
        chunks.len(),
        word_count,
        files_read.len()
    );

    Ok(IngestReport {
        chunks,
        files_read,
        files_skipped,
        word_count,
    })
}

/// List the files to ingest under `source`
fn collect_files(source: &Path, registry: &ParserRegistry) -> Result<Vec<PathBuf>> {
    if !source.exists() {
        return Err(ParserError::NotFound(source.display().to_string()));
    }

    if source.is_file() {
        if !registry.supports(source) {
            return Err(ParserError::UnsupportedFormat(source.display().to_string()));
        }
        return Ok(vec![source.to_path_buf()]);
    }

    let entries = std::fs::read_dir(source).map_err(|e| ParserError::IoError {
        path: source.display().to_string(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && registry.supports(path))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(ParserError::NoDocuments(source.display().to_string()));
    }

    Ok(files)
}
