//! Placeholder DOCX output for PDF input.
//!
//! No text is taken from the PDF. The output is a valid word-processing
//! document holding a single paragraph with the configured placeholder.

use docx_rs::{Docx, Paragraph, Run};
use std::io::Cursor;

/// Build a one-paragraph DOCX containing `text`.
pub fn placeholder_docx(text: &str) -> Result<Vec<u8>, String> {
    let mut buf = Cursor::new(Vec::new());
    Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
        .build()
        .pack(&mut buf)
        .map_err(|e| e.to_string())?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn document_xml(docx: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(docx)).expect("valid zip");
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .expect("document part")
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn writes_placeholder_paragraph() {
        let bytes = placeholder_docx("Nothing to see here").unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));
        assert!(document_xml(&bytes).contains("Nothing to see here"));
    }

    #[test]
    fn output_is_readable_by_the_markup_extractor() {
        use crate::pipeline::markup::{DocxMarkupExtractor, MarkupExtractor};
        let bytes = placeholder_docx("Round trip").unwrap();
        let markup = DocxMarkupExtractor.extract(&bytes).unwrap();
        assert!(markup.contains("Round trip"), "got: {markup}");
    }
}
