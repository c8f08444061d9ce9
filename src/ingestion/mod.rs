//! Document ingestion: PDF parsing and text chunking

mod chunker;
mod parser;

pub use chunker::TextSplitter;
pub use parser::{PageText, ParsedPdf, PdfParser};
