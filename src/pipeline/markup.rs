//! DOCX → simplified markup extraction (first stage of the DOCX route).
//!
//! The markup is a tiny HTML subset, one block per line:
//!
//! ```text
//! <h1>Quarterly report</h1>
//! <p>Revenue grew <b>12%</b> over <i>last</i> quarter.</p>
//! <li>first item</li>
//! ```
//!
//! Block tags: `h1`–`h6`, `p`, `li`. Inline tags: `b`, `i`, `br`. Text is
//! HTML-escaped (`&amp;`, `&lt;`, `&gt;`).
//!
//! The built-in [`DocxMarkupExtractor`] reads `word/document.xml` from the
//! DOCX container and walks it with a streaming XML reader, mapping
//! paragraphs, paragraph styles, numbering and run formatting. Tables and
//! text boxes contribute their paragraphs' text only.

use crate::pipeline::input::has_zip_magic;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Read;
use thiserror::Error;
use tracing::debug;

/// Why markup extraction failed.
#[derive(Debug, Error)]
pub enum MarkupError {
    /// Input is not a readable ZIP container.
    #[error("not a DOCX container: {0}")]
    Archive(String),

    /// A required part is missing from the container.
    #[error("DOCX is missing required part '{0}'")]
    MissingPart(&'static str),

    /// The main document part is not well-formed UTF-8 XML.
    #[error("malformed document part: {0}")]
    Malformed(String),

    /// Failure reported by a custom extractor.
    #[error("{0}")]
    Other(String),
}

/// Converts DOCX bytes into markup.
pub trait MarkupExtractor: Send + Sync {
    fn extract(&self, docx: &[u8]) -> Result<String, MarkupError>;
}

/// Built-in extractor for Office Open XML word-processing documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxMarkupExtractor;

const DOCUMENT_PART: &str = "word/document.xml";

impl MarkupExtractor for DocxMarkupExtractor {
    fn extract(&self, docx: &[u8]) -> Result<String, MarkupError> {
        if !has_zip_magic(docx) {
            return Err(MarkupError::Archive("missing ZIP signature".into()));
        }
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(docx))
            .map_err(|e| MarkupError::Archive(e.to_string()))?;

        let mut xml = String::new();
        {
            let mut part = archive.by_name(DOCUMENT_PART).map_err(|e| match e {
                zip::result::ZipError::FileNotFound => MarkupError::MissingPart(DOCUMENT_PART),
                other => MarkupError::Archive(other.to_string()),
            })?;
            part.read_to_string(&mut xml)
                .map_err(|e| MarkupError::Malformed(e.to_string()))?;
        }

        let markup = document_xml_to_markup(&xml)?;
        debug!(
            "Extracted {} bytes of markup from {} bytes of document XML",
            markup.len(),
            xml.len()
        );
        Ok(markup)
    }
}

// ── document.xml → markup ────────────────────────────────────────────────

/// Block kind of one paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Heading(u8),
    Paragraph,
    ListItem,
}

impl Block {
    fn tag(self) -> String {
        match self {
            Block::Heading(level) => format!("h{level}"),
            Block::Paragraph => "p".to_string(),
            Block::ListItem => "li".to_string(),
        }
    }

    fn from_style(style: &str) -> Option<Self> {
        if style.eq_ignore_ascii_case("Title") {
            return Some(Block::Heading(1));
        }
        if let Some(level) = style
            .strip_prefix("Heading")
            .or_else(|| style.strip_prefix("heading"))
            .and_then(|n| n.trim().parse::<u8>().ok())
        {
            return Some(Block::Heading(level.clamp(1, 6)));
        }
        if style.eq_ignore_ascii_case("ListParagraph") {
            return Some(Block::ListItem);
        }
        None
    }
}

/// One `<w:r>` being collected.
#[derive(Debug, Default)]
struct RunFrame {
    bold: bool,
    italic: bool,
    in_props: bool,
    in_text: bool,
    text: String,
}

impl RunFrame {
    fn markup(&self) -> String {
        let text = &self.text;
        match (self.bold, self.italic) {
            _ if text.is_empty() => String::new(),
            (true, true) => format!("<b><i>{text}</i></b>"),
            (true, false) => format!("<b>{text}</b>"),
            (false, true) => format!("<i>{text}</i>"),
            (false, false) => text.clone(),
        }
    }
}

/// One `<w:p>` being collected. Paragraphs nest through text boxes, so the
/// walker keeps a stack of these.
#[derive(Debug)]
struct ParagraphFrame {
    style: Option<Block>,
    numbered: bool,
    in_props: bool,
    run: Option<RunFrame>,
    inline: String,
}

impl ParagraphFrame {
    fn new() -> Self {
        Self {
            style: None,
            numbered: false,
            in_props: false,
            run: None,
            inline: String::new(),
        }
    }

    fn close_run(&mut self) {
        if let Some(run) = self.run.take() {
            self.inline.push_str(&run.markup());
        }
    }

    fn finish(mut self, out: &mut String) {
        self.close_run();
        let block = match self.style {
            Some(block) => block,
            None if self.numbered => Block::ListItem,
            None => Block::Paragraph,
        };
        let tag = block.tag();
        out.push_str(&format!("<{tag}>{}</{tag}>\n", self.inline));
    }
}

/// `w:val` of a toggle property (`<w:b/>`, `<w:i w:val="0"/>`); absent means on.
fn toggle_value(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"val")
        .is_none_or(|a| !matches!(&*a.value, b"0" | b"false" | b"off"))
}

fn string_value(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"val")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Map a WordprocessingML main document part to markup.
///
/// Paragraphs inside text boxes are emitted as their own blocks, ahead of
/// the paragraph that anchors the box. `mc:Fallback` copies are ignored.
pub fn document_xml_to_markup(xml: &str) -> Result<String, MarkupError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<ParagraphFrame> = Vec::new();
    let mut out = String::new();
    // Depth inside `mc:Fallback`, which repeats the `mc:Choice` content.
    let mut fallback = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| MarkupError::Malformed(e.to_string()))?;
        if fallback > 0 {
            match &event {
                Event::Start(e) if e.local_name().as_ref() == b"Fallback" => fallback += 1,
                Event::End(e) if e.local_name().as_ref() == b"Fallback" => fallback -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        match event {
            Event::Start(e) if e.local_name().as_ref() == b"Fallback" => fallback = 1,
            Event::Start(e) => on_open(&mut stack, &e, false),
            Event::Empty(e) => {
                on_open(&mut stack, &e, true);
                if e.local_name().as_ref() == b"p" {
                    if let Some(frame) = stack.pop() {
                        frame.finish(&mut out);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(frame) = stack.pop() {
                        frame.finish(&mut out);
                    }
                }
                b"pPr" => {
                    if let Some(frame) = stack.last_mut() {
                        frame.in_props = false;
                    }
                }
                b"r" => {
                    if let Some(frame) = stack.last_mut() {
                        frame.close_run();
                    }
                }
                b"rPr" | b"t" => {
                    if let Some(run) = stack.last_mut().and_then(|f| f.run.as_mut()) {
                        if e.local_name().as_ref() == b"t" {
                            run.in_text = false;
                        } else {
                            run.in_props = false;
                        }
                    }
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(run) = text_run(&mut stack) {
                    let text = t
                        .decode()
                        .map_err(|e| MarkupError::Malformed(e.to_string()))?;
                    run.text.push_str(&escape_html(&text));
                }
            }
            Event::CData(t) => {
                if let Some(run) = text_run(&mut stack) {
                    run.text
                        .push_str(&escape_html(&String::from_utf8_lossy(&t)));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(run) = text_run(&mut stack) {
                    let resolved = match r
                        .resolve_char_ref()
                        .map_err(|e| MarkupError::Malformed(e.to_string()))?
                    {
                        Some(c) => c.to_string(),
                        None => {
                            let name = r
                                .decode()
                                .map_err(|e| MarkupError::Malformed(e.to_string()))?;
                            resolve_predefined_entity(&name)
                                .ok_or_else(|| {
                                    MarkupError::Malformed(format!("unknown entity &{name};"))
                                })?
                                .to_string()
                        }
                    };
                    run.text.push_str(&escape_html(&resolved));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(MarkupError::Malformed(format!(
            "{} paragraph(s) left open at end of document",
            stack.len()
        )));
    }
    Ok(out)
}

/// The run currently inside a `<w:t>`, if any.
fn text_run(stack: &mut [ParagraphFrame]) -> Option<&mut RunFrame> {
    stack
        .last_mut()
        .and_then(|f| f.run.as_mut())
        .filter(|r| r.in_text)
}

fn on_open(stack: &mut Vec<ParagraphFrame>, e: &BytesStart<'_>, empty: bool) {
    let name = e.local_name();
    if name.as_ref() == b"p" {
        stack.push(ParagraphFrame::new());
        return;
    }
    let Some(frame) = stack.last_mut() else {
        return;
    };

    if frame.in_props {
        match name.as_ref() {
            b"pStyle" => frame.style = string_value(e).as_deref().and_then(Block::from_style),
            b"numPr" => frame.numbered = true,
            _ => {}
        }
        return;
    }

    match name.as_ref() {
        b"pPr" if !empty => frame.in_props = true,
        b"r" => {
            frame.close_run();
            if !empty {
                frame.run = Some(RunFrame::default());
            }
        }
        _ => {
            let Some(run) = frame.run.as_mut() else {
                return;
            };
            match name.as_ref() {
                b"rPr" if !empty => run.in_props = true,
                b"b" if run.in_props => run.bold = toggle_value(e),
                b"i" if run.in_props => run.italic = toggle_value(e),
                b"t" if !empty && !run.in_props => run.in_text = true,
                b"tab" if !run.in_props => run.text.push('\t'),
                b"br" | b"cr" if !run.in_props => run.text.push_str("<br>"),
                _ => {}
            }
        }
    }
}

/// Escape text for inclusion in markup.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
