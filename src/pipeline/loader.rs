use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentReadError {
    #[error("I/O error reading document: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),
}

/// PDF decode capability. Yields one raw text string per page, in page
/// order. Pluggable so tests can substitute canned pages for a real file.
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Vec<String>, DocumentReadError>;
}

/// Production loader over the pdf-extract crate. Handles digital PDFs
/// with embedded text layers; a scanned page with no text layer yields
/// an empty string rather than an error.
pub struct PdfTextLoader;

impl DocumentLoader for PdfTextLoader {
    fn load(&self, path: &Path) -> Result<Vec<String>, DocumentReadError> {
        let bytes = std::fs::read(path)?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| DocumentReadError::PdfParsing(e.to_string()))?;
        Ok(pages)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::make_test_pdf;
    use super::*;

    #[test]
    fn loads_text_from_digital_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, make_test_pdf("Patient report content")).unwrap();

        let pages = PdfTextLoader.load(&path).unwrap();
        assert!(!pages.is_empty(), "should extract at least one page");
        let full: String = pages.concat();
        assert!(
            full.contains("Patient") || full.contains("report"),
            "expected extracted text, got: {full}"
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = PdfTextLoader.load(Path::new("/nonexistent/report.pdf"));
        assert!(matches!(result, Err(DocumentReadError::Io(_))));
    }

    #[test]
    fn non_pdf_bytes_are_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.pdf");
        std::fs::write(&path, b"plain text, not a pdf").unwrap();

        let result = PdfTextLoader.load(&path);
        assert!(matches!(result, Err(DocumentReadError::PdfParsing(_))));
    }

    #[test]
    fn zero_byte_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();

        let result = PdfTextLoader.load(&path);
        assert!(result.is_err());
    }
}
