//! PDF document parser using pdf-extract
//!
//! Extracts the text layer of résumé PDFs. Layout is discarded; the
//! chunker only cares about words.

use std::path::Path;

use crate::{DocumentParser, FileType, ParsedDocument, ParserError, Result};

/// PDF document parser
#[derive(Debug, Clone, Default)]
pub struct PdfParser;

impl PdfParser {
    /// Create a new PDF parser
    pub fn new() -> Self {
        Self
    }

    /// Extract text from PDF bytes, with a page count estimated from
    /// form feeds between pages
    pub fn extract_from_bytes(&self, bytes: &[u8]) -> Result<(String, Option<u32>)> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParserError::PdfError(e.to_string()))?;

        let page_breaks = text.matches('\x0C').count() as u32;
        let page_count = if page_breaks > 0 {
            Some(page_breaks + 1)
        } else {
            None
        };

        Ok((text, page_count))
    }
}

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let (text, page_count) = self.extract_from_bytes(&bytes)?;

        let mut doc = ParsedDocument::new(path.display().to_string(), FileType::Pdf)
            .with_content(text);
        doc.page_count = page_count;

        Ok(doc)
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Pdf]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_types() {
        let parser = PdfParser::new();
        assert!(parser.can_parse(FileType::Pdf));
        assert!(!parser.can_parse(FileType::PlainText));
    }

    #[test]
    fn test_garbage_bytes_are_a_pdf_error() {
        let parser = PdfParser::new();
        let err = parser.extract_from_bytes(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, ParserError::PdfError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let parser = PdfParser::new();
        let err = parser.parse(Path::new("/nonexistent/resume.pdf")).unwrap_err();
        assert!(matches!(err, ParserError::IoError { .. }));
    }
}
