//! PDF loading and text extraction

use std::path::Path;

use crate::error::{Error, Result};

/// Text content of a single page
#[derive(Debug, Clone)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Extracted text of the page
    pub content: String,
}

/// A parsed PDF with per-page text
#[derive(Debug, Clone)]
pub struct ParsedPdf {
    /// Filename of the source file
    pub filename: String,
    /// Total pages in the document, including pages without text
    pub total_pages: u32,
    /// Pages that contained extractable text
    pub pages: Vec<PageText>,
}

/// PDF parser
pub struct PdfParser;

impl PdfParser {
    /// Read and parse a PDF file from disk
    pub fn parse_file(path: &Path) -> Result<ParsedPdf> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let data = std::fs::read(path)
            .map_err(|e| Error::pdf_parse(&filename, format!("failed to read file: {}", e)))?;

        Self::parse(&filename, &data)
    }

    /// Parse a PDF from memory
    ///
    /// Extracts text page by page; if the page-wise pass fails the whole
    /// document is extracted as a single page instead.
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedPdf> {
        let raw_pages = match pdf_extract::extract_text_from_mem_by_pages(data) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(
                    "Page-wise extraction failed for '{}': {}, falling back to whole-document extraction",
                    filename,
                    e
                );
                let text = pdf_extract::extract_text_from_mem(data)
                    .map_err(|e| Error::pdf_parse(filename, e.to_string()))?;
                vec![text]
            }
        };

        let extracted_count = raw_pages.len() as u32;
        let pages: Vec<PageText> = raw_pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText {
                page_number: i as u32 + 1,
                content: normalize_text(&text),
            })
            .filter(|page| !page.content.is_empty())
            .collect();

        if pages.is_empty() {
            return Err(Error::pdf_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        // The fallback path loses page boundaries; recover the real page
        // count from the document structure when possible.
        let total_pages = match lopdf::Document::load_mem(data) {
            Ok(doc) => doc.get_pages().len() as u32,
            Err(_) => extracted_count,
        };

        Ok(ParsedPdf {
            filename: filename.to_string(),
            total_pages,
            pages,
        })
    }
}

/// Clean extracted text: strip null characters, trim lines, drop blank lines
fn normalize_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_nulls_and_blank_lines() {
        let raw = "First line  \n\n\n  Second\0 line\n   \n";
        assert_eq!(normalize_text(raw), "First line\nSecond line");
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \n \n\t\n"), "");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = PdfParser::parse("not-a-pdf.pdf", b"plain text, not a pdf").unwrap_err();
        assert!(matches!(err, Error::PdfParse { .. }));
        assert!(err.to_string().contains("not-a-pdf.pdf"));
    }
}
