//! # undocx
//!
//! Structural text extraction from DOCX files with resolved formatting.
//!
//! The parser reads the OOXML package directly, resolves the full formatting
//! cascade (document defaults, `basedOn` style chains, numbering level
//! contributions, direct formatting) and replays list counters in document
//! order. The output is a flat sequence of lines, each carrying annotation
//! spans over character ranges plus a stable content-derived uid.
//!
//! ## Quick Start
//!
//! ```no_run
//! use undocx::extract_lines_with_meta;
//!
//! let lines = extract_lines_with_meta("document.docx")?;
//! for line in &lines {
//!     println!("{}: {} annotations", line.text, line.annotations.len());
//! }
//! # Ok::<(), undocx::Error>(())
//! ```
//!
//! For repeated access, hold a [`docx::DocxParser`]: it parses once and
//! memoizes the line output.

pub mod container;
pub mod docx;
pub mod error;
pub mod model;

// Re-exports
pub use container::OoxmlContainer;
pub use docx::{DocxParser, ParseState};
pub use error::{Error, Result};
pub use model::{Annotation, AnnotationKind, LineRecord, Origin, ResolvedProperties};

use std::path::Path;

fn parser_for(path: impl AsRef<Path>) -> Result<DocxParser> {
    let path = path.as_ref();
    if !DocxParser::can_parse(path) {
        return Err(Error::NotDocx(path.display().to_string()));
    }
    Ok(DocxParser::new(path))
}

/// Extract all paragraph texts from a DOCX file, in document order. Empty
/// paragraphs are kept.
pub fn extract_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    parser_for(path)?.get_lines()
}

/// Extract annotated line records from a DOCX file. Empty lines are dropped.
pub fn extract_lines_with_meta(path: impl AsRef<Path>) -> Result<Vec<LineRecord>> {
    parser_for(path)?.get_lines_with_meta()
}

/// Extract the document's plain text: all lines joined with newlines.
pub fn extract_text(path: impl AsRef<Path>) -> Result<String> {
    Ok(extract_lines(path)?.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_docx_path_rejected() {
        let err = extract_lines("notes.txt").unwrap_err();
        assert!(matches!(err, Error::NotDocx(_)));
    }
}
