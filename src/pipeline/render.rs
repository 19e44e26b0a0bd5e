//! Markup → paginated PDF (second stage of the DOCX route).
//!
//! The built-in [`PdfMarkupRenderer`] lays out the markup produced by
//! [`crate::pipeline::markup`] on A4 pages: word wrapping at the right
//! margin, scaled bold headings, a bullet for list items and a page break
//! whenever the next line would cross the bottom margin.

use crate::pipeline::pdf::{text_width, FontFace, PdfBuilder, TextRun, A4_HEIGHT_PT, A4_WIDTH_PT};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Why rendering failed.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Layout parameters leave no usable area.
    #[error("invalid page layout: {0}")]
    Layout(String),

    /// Failure reported by a custom renderer.
    #[error("{0}")]
    Other(String),
}

/// Page geometry and base typography.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub font_size: f32,
    pub margin_pt: f32,
}

impl PageLayout {
    /// Reject geometry that leaves no room for at least four em of text
    /// per line.
    pub fn check(&self) -> Result<(), RenderError> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(RenderError::Layout(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        let usable = A4_WIDTH_PT - 2.0 * self.margin_pt;
        if usable.is_nan() || usable <= self.font_size * 4.0 {
            return Err(RenderError::Layout(format!(
                "margin {}pt leaves {usable:.1}pt of line width at {}pt text",
                self.margin_pt, self.font_size
            )));
        }
        Ok(())
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            font_size: 11.0,
            margin_pt: 56.0,
        }
    }
}

/// A finished PDF with its page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Turns markup into a paginated PDF.
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, markup: &str, layout: &PageLayout) -> Result<RenderedPdf, RenderError>;
}

/// Built-in renderer using the standard Helvetica faces.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfMarkupRenderer;

impl MarkupRenderer for PdfMarkupRenderer {
    fn render(&self, markup: &str, layout: &PageLayout) -> Result<RenderedPdf, RenderError> {
        layout.check()?;

        let blocks = parse_blocks(markup);
        let pages = paginate(&blocks, layout);

        let mut builder = PdfBuilder::new();
        for page in &pages {
            builder.add_text_page(page);
        }
        let page_count = builder.page_count();
        debug!(
            "Rendered {} blocks onto {} pages",
            blocks.len(),
            page_count
        );
        Ok(RenderedPdf {
            bytes: builder.finish(),
            pages: page_count,
        })
    }
}

// ── Markup parsing ───────────────────────────────────────────────────────

static BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<(h[1-6]|p|li)>(.*?)</(?:h[1-6]|p|li)>").unwrap());

static INLINE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)([a-zA-Z0-9]+)\s*/?>").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
}

#[derive(Debug, Clone, PartialEq)]
struct Span {
    face: FontFace,
    text: String,
}

/// One block: a sequence of spans; `None` marks a forced line break.
#[derive(Debug, Clone, PartialEq)]
struct ParsedBlock {
    kind: BlockKind,
    spans: Vec<Option<Span>>,
}

fn parse_blocks(markup: &str) -> Vec<ParsedBlock> {
    let mut blocks: Vec<ParsedBlock> = BLOCK
        .captures_iter(markup)
        .map(|c| {
            let kind = match &c[1] {
                "p" => BlockKind::Paragraph,
                "li" => BlockKind::ListItem,
                h => BlockKind::Heading(h[1..].parse().unwrap_or(1)),
            };
            ParsedBlock {
                kind,
                spans: parse_inline(&c[2], matches!(kind, BlockKind::Heading(_))),
            }
        })
        .collect();

    // Markup without block tags is treated as a single paragraph.
    if blocks.is_empty() && !markup.trim().is_empty() {
        blocks.push(ParsedBlock {
            kind: BlockKind::Paragraph,
            spans: parse_inline(markup, false),
        });
    }
    blocks
}

fn parse_inline(s: &str, base_bold: bool) -> Vec<Option<Span>> {
    let mut spans = Vec::new();
    let (mut bold, mut italic) = (0usize, 0usize);
    let mut last = 0;

    let push_text = |spans: &mut Vec<Option<Span>>, text: &str, bold: usize, italic: usize| {
        if text.is_empty() {
            return;
        }
        spans.push(Some(Span {
            face: FontFace::new(base_bold || bold > 0, italic > 0),
            text: unescape_html(text),
        }));
    };

    for tag in INLINE_TAG.captures_iter(s) {
        let m = tag.get(0).map_or(0..0, |m| m.range());
        push_text(&mut spans, &s[last..m.start], bold, italic);
        last = m.end;

        let closing = &tag[1] == "/";
        match (tag[2].to_ascii_lowercase().as_str(), closing) {
            ("b" | "strong", false) => bold += 1,
            ("b" | "strong", true) => bold = bold.saturating_sub(1),
            ("i" | "em", false) => italic += 1,
            ("i" | "em", true) => italic = italic.saturating_sub(1),
            ("br", _) => spans.push(None),
            _ => {}
        }
    }
    push_text(&mut spans, &s[last..], bold, italic);
    spans
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

// ── Layout ───────────────────────────────────────────────────────────────

fn heading_scale(level: u8) -> f32 {
    match level {
        1 => 2.0,
        2 => 1.6,
        3 => 1.35,
        4 => 1.2,
        5 => 1.1,
        _ => 1.0,
    }
}

/// A laid-out line: runs positioned relative to the line start.
struct Line {
    size: f32,
    runs: Vec<(f32, FontFace, String)>,
}

fn paginate(blocks: &[ParsedBlock], layout: &PageLayout) -> Vec<Vec<TextRun>> {
    let left = layout.margin_pt;
    let top = A4_HEIGHT_PT - layout.margin_pt;
    let bottom = layout.margin_pt;
    let max_width = A4_WIDTH_PT - 2.0 * layout.margin_pt;

    let mut pages: Vec<Vec<TextRun>> = Vec::new();
    let mut current: Vec<TextRun> = Vec::new();
    let mut y = top;

    for block in blocks {
        let size = match block.kind {
            BlockKind::Heading(level) => layout.font_size * heading_scale(level),
            _ => layout.font_size,
        };
        let (indent, bullet) = match block.kind {
            BlockKind::ListItem => (layout.font_size * 1.5, true),
            _ => (0.0, false),
        };

        let lines = wrap(&block.spans, size, max_width - indent);
        let leading = size * 1.3;

        for (i, line) in lines.iter().enumerate() {
            // Break unless this is already the first line of a page.
            if y - leading < bottom && y < top {
                pages.push(std::mem::take(&mut current));
                y = top;
            }
            y -= leading;
            if bullet && i == 0 {
                current.push(TextRun {
                    x: left + layout.font_size * 0.4,
                    y,
                    size,
                    face: FontFace::Regular,
                    text: "•".to_string(),
                });
            }
            for (dx, face, text) in &line.runs {
                current.push(TextRun {
                    x: left + indent + dx,
                    y,
                    size: line.size,
                    face: *face,
                    text: text.clone(),
                });
            }
        }
        // Paragraph spacing.
        y -= size * 0.5;
    }

    if y < top || pages.is_empty() {
        pages.push(current);
    }
    pages
}

/// Break spans into lines no wider than `max_width`.
///
/// A block with no text still yields one empty line so blank paragraphs
/// keep their vertical space.
fn wrap(spans: &[Option<Span>], size: f32, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line {
        size,
        runs: Vec::new(),
    };
    let mut x = 0.0f32;

    for span in spans {
        let Some(span) = span else {
            lines.push(std::mem::replace(
                &mut line,
                Line {
                    size,
                    runs: Vec::new(),
                },
            ));
            x = 0.0;
            continue;
        };

        for word in split_keep_space(&span.text) {
            let w = text_width(word, size, span.face);
            let is_space = word.trim().is_empty();
            if x + w > max_width && x > 0.0 {
                lines.push(std::mem::replace(
                    &mut line,
                    Line {
                        size,
                        runs: Vec::new(),
                    },
                ));
                x = 0.0;
                if is_space {
                    continue;
                }
            }
            if x == 0.0 && is_space {
                continue;
            }
            line.runs.push((x, span.face, word.to_string()));
            x += w;
        }
    }
    lines.push(line);
    lines
}

/// Split into alternating words and whitespace runs, keeping both.
fn split_keep_space(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                parts.push(&text[start..i]);
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn parses_blocks_and_inline_styles() {
        let blocks = parse_blocks("<h2>Title</h2>\n<p>a <b>bold</b> <i>it</i></p>\n<li>x</li>\n");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].kind, BlockKind::Heading(2));
        assert_eq!(
            blocks[0].spans,
            vec![Some(Span {
                face: FontFace::Bold,
                text: "Title".into()
            })]
        );
        let faces: Vec<_> = blocks[1]
            .spans
            .iter()
            .flatten()
            .map(|s| (s.face, s.text.as_str()))
            .collect();
        assert_eq!(
            faces,
            [
                (FontFace::Regular, "a "),
                (FontFace::Bold, "bold"),
                (FontFace::Regular, " "),
                (FontFace::Oblique, "it"),
            ]
        );
        assert_eq!(blocks[2].kind, BlockKind::ListItem);
    }

    #[test]
    fn br_becomes_line_break_and_entities_unescape() {
        let blocks = parse_blocks("<p>a &amp; b<br>c &lt;d&gt;</p>");
        let spans = &blocks[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].as_ref().unwrap().text, "a & b");
        assert!(spans[1].is_none());
        assert_eq!(spans[2].as_ref().unwrap().text, "c <d>");
    }

    #[test]
    fn bare_text_is_one_paragraph() {
        let blocks = parse_blocks("just text");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
    }

    #[test]
    fn long_paragraph_wraps_within_width() {
        let text = "lorem ipsum dolor sit amet ".repeat(40);
        let spans = vec![Some(Span {
            face: FontFace::Regular,
            text,
        })];
        let lines = wrap(&spans, 11.0, 400.0);
        assert!(lines.len() > 5, "got {} lines", lines.len());
        for line in &lines {
            let end = line
                .runs
                .last()
                .map(|(x, f, t)| x + text_width(t, 11.0, *f))
                .unwrap_or(0.0);
            assert!(end <= 400.0 + 0.01, "line overflows: {end}");
            assert!(line.runs.first().map_or(true, |(_, _, t)| !t.trim().is_empty()));
        }
    }

    #[test]
    fn split_keeps_whitespace_runs() {
        assert_eq!(split_keep_space("a  bc d"), ["a", "  ", "bc", " ", "d"]);
        assert!(split_keep_space("").is_empty());
    }

    #[test]
    fn many_paragraphs_span_multiple_pages() {
        let markup = "<p>line</p>\n".repeat(200);
        let pdf = PdfMarkupRenderer
            .render(&markup, &PageLayout::default())
            .unwrap();
        assert!(pdf.pages > 1, "got {} pages", pdf.pages);
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(
            count(&pdf.bytes, b"/Type /Page") - count(&pdf.bytes, b"/Type /Pages"),
            pdf.pages
        );
    }

    #[test]
    fn empty_markup_gives_one_blank_page() {
        let pdf = PdfMarkupRenderer.render("", &PageLayout::default()).unwrap();
        assert_eq!(pdf.pages, 1);
    }

    #[test]
    fn text_reaches_content_stream() {
        let pdf = PdfMarkupRenderer
            .render("<h1>Quarterly</h1><p>Revenue</p>", &PageLayout::default())
            .unwrap();
        assert_eq!(count(&pdf.bytes, b"(Quarterly)"), 1);
        assert_eq!(count(&pdf.bytes, b"(Revenue)"), 1);
    }

    #[test]
    fn rejects_degenerate_layout() {
        let layout = PageLayout {
            font_size: 11.0,
            margin_pt: 290.0,
        };
        assert!(matches!(
            PdfMarkupRenderer.render("<p>x</p>", &layout),
            Err(RenderError::Layout(_))
        ));
        let layout = PageLayout {
            font_size: f32::NAN,
            margin_pt: 56.0,
        };
        assert!(PdfMarkupRenderer.render("<p>x</p>", &layout).is_err());
    }
}
