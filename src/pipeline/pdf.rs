//! PDF assembly on top of `pdf-writer`.
//!
//! [`PdfBuilder`] collects pages one at a time and serialises the whole
//! document in [`PdfBuilder::finish`]. Two page kinds exist:
//!
//! * **image pages** — one JPEG XObject, scaled to the page width and
//!   anchored at the top edge (the image batch route);
//! * **text pages** — pre-positioned runs in the four standard Helvetica
//!   faces with WinAnsi encoding (the DOCX route).
//!
//! Every page is A4 portrait.

use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};

/// A4 width in PostScript points.
pub const A4_WIDTH_PT: f32 = 595.28;
/// A4 height in PostScript points.
pub const A4_HEIGHT_PT: f32 = 841.89;

/// One of the four standard Helvetica faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

impl FontFace {
    pub fn new(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontFace::Regular,
            (true, false) => FontFace::Bold,
            (false, true) => FontFace::Oblique,
            (true, true) => FontFace::BoldOblique,
        }
    }

    fn base_font(self) -> &'static [u8] {
        match self {
            FontFace::Regular => b"Helvetica",
            FontFace::Bold => b"Helvetica-Bold",
            FontFace::Oblique => b"Helvetica-Oblique",
            FontFace::BoldOblique => b"Helvetica-BoldOblique",
        }
    }

    fn resource_name(self) -> &'static [u8] {
        match self {
            FontFace::Regular => b"F1",
            FontFace::Bold => b"F2",
            FontFace::Oblique => b"F3",
            FontFace::BoldOblique => b"F4",
        }
    }

    const ALL: [FontFace; 4] = [
        FontFace::Regular,
        FontFace::Bold,
        FontFace::Oblique,
        FontFace::BoldOblique,
    ];
}

/// A run of text at an absolute position (origin bottom-left, points).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub face: FontFace,
    pub text: String,
}

/// Incrementally built PDF document.
pub struct PdfBuilder {
    pdf: Pdf,
    alloc: Ref,
    catalog_id: Ref,
    page_tree_id: Ref,
    page_ids: Vec<Ref>,
    fonts: Option<[Ref; 4]>,
    image_count: usize,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut alloc = Ref::new(1);
        let catalog_id = alloc.bump();
        let page_tree_id = alloc.bump();
        Self {
            pdf: Pdf::new(),
            alloc,
            catalog_id,
            page_tree_id,
            page_ids: Vec::new(),
            fonts: None,
            image_count: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Add a page showing one baseline JPEG of `width` × `height` pixels.
    ///
    /// The image fills the page width and keeps its aspect ratio. If that
    /// would overflow the page height it is scaled down to fit, still
    /// anchored at the top-left corner.
    pub fn add_image_page(&mut self, jpeg: &[u8], width: u32, height: u32, grayscale: bool) {
        let image_id = self.alloc.bump();
        let page_id = self.alloc.bump();
        let content_id = self.alloc.bump();
        let name = format!("Im{}", self.image_count);
        self.image_count += 1;

        let mut image = self.pdf.image_xobject(image_id, jpeg);
        image.filter(Filter::DctDecode);
        image.width(width as i32);
        image.height(height as i32);
        if grayscale {
            image.color_space().device_gray();
        } else {
            image.color_space().device_rgb();
        }
        image.bits_per_component(8);
        image.finish();

        let (draw_w, draw_h) = fit_to_page(width, height);
        let mut content = Content::new();
        content.save_state();
        content.transform([draw_w, 0.0, 0.0, draw_h, 0.0, A4_HEIGHT_PT - draw_h]);
        content.x_object(Name(name.as_bytes()));
        content.restore_state();
        self.pdf.stream(content_id, &content.finish());

        let mut page = self.pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, A4_WIDTH_PT, A4_HEIGHT_PT));
        page.parent(self.page_tree_id);
        page.contents(content_id);
        page.resources().x_objects().pair(Name(name.as_bytes()), image_id);
        page.finish();

        self.page_ids.push(page_id);
    }

    /// Add a page containing the given text runs.
    pub fn add_text_page(&mut self, runs: &[TextRun]) {
        let fonts = self.font_refs();
        let page_id = self.alloc.bump();
        let content_id = self.alloc.bump();

        let mut content = Content::new();
        for run in runs.iter().filter(|r| !r.text.is_empty()) {
            content.begin_text();
            content.set_font(Name(run.face.resource_name()), run.size);
            content.set_text_matrix([1.0, 0.0, 0.0, 1.0, run.x, run.y]);
            content.show(Str(&encode_win_ansi(&run.text)));
            content.end_text();
        }
        self.pdf.stream(content_id, &content.finish());

        let mut page = self.pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, A4_WIDTH_PT, A4_HEIGHT_PT));
        page.parent(self.page_tree_id);
        page.contents(content_id);
        {
            let mut resources = page.resources();
            let mut font_dict = resources.fonts();
            for (face, id) in FontFace::ALL.iter().zip(fonts) {
                font_dict.pair(Name(face.resource_name()), id);
            }
        }
        page.finish();

        self.page_ids.push(page_id);
    }

    /// Serialise the document.
    pub fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.page_tree_id);
        self.pdf
            .pages(self.page_tree_id)
            .kids(self.page_ids.iter().copied())
            .count(self.page_ids.len() as i32);
        self.pdf.finish()
    }

    /// Font objects are written once, on the first text page.
    fn font_refs(&mut self) -> [Ref; 4] {
        if let Some(refs) = self.fonts {
            return refs;
        }
        let refs = [
            self.alloc.bump(),
            self.alloc.bump(),
            self.alloc.bump(),
            self.alloc.bump(),
        ];
        for (face, id) in FontFace::ALL.iter().zip(refs) {
            self.pdf
                .type1_font(id)
                .base_font(Name(face.base_font()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        self.fonts = Some(refs);
        refs
    }
}

/// Drawn size, in points, of a `width` × `height` px image on an A4 page.
pub fn fit_to_page(width: u32, height: u32) -> (f32, f32) {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let mut draw_w = A4_WIDTH_PT;
    let mut draw_h = h * A4_WIDTH_PT / w;
    if draw_h > A4_HEIGHT_PT {
        draw_w *= A4_HEIGHT_PT / draw_h;
        draw_h = A4_HEIGHT_PT;
    }
    (draw_w, draw_h)
}

/// Encode text for a WinAnsi-encoded standard font.
///
/// Latin-1 maps directly; common typographic punctuation uses the
/// Windows-1252 slots; anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

/// Approximate advance width of `text` in points for a Helvetica face.
///
/// Uses coarse glyph classes from the Helvetica AFM metrics; good enough
/// for line breaking, not for justification.
pub fn text_width(text: &str, size: f32, face: FontFace) -> f32 {
    let em: f32 = text
        .chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | '\'' | '|' | '.' | ',' | ':' | ';' | '!' => 0.25,
            ' ' | 'f' | 't' | 'I' | '(' | ')' | '[' | ']' | '-' | '/' => 0.3,
            'r' => 0.35,
            'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.85,
            'A'..='Z' => 0.68,
            '0'..='9' => 0.556,
            _ => 0.54,
        })
        .sum();
    let bold = matches!(face, FontFace::Bold | FontFace::BoldOblique);
    em * size * if bold { 1.06 } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn page_objects(bytes: &[u8]) -> usize {
        count(bytes, b"/Type /Page") - count(bytes, b"/Type /Pages")
    }

    #[test]
    fn empty_document_is_valid_pdf() {
        let bytes = PdfBuilder::new().finish();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(count(&bytes, b"/Count 0"), 1);
        assert_eq!(page_objects(&bytes), 0);
    }

    #[test]
    fn one_page_per_image() {
        let mut b = PdfBuilder::new();
        b.add_image_page(b"\xFF\xD8fake", 100, 50, false);
        b.add_image_page(b"\xFF\xD8fake", 50, 100, true);
        assert_eq!(b.page_count(), 2);
        let bytes = b.finish();
        assert_eq!(page_objects(&bytes), 2);
        assert_eq!(count(&bytes, b"/Count 2"), 1);
        assert_eq!(count(&bytes, b"/DCTDecode"), 2);
        assert_eq!(count(&bytes, b"/DeviceGray"), 1);
    }

    #[test]
    fn fonts_written_once_across_text_pages() {
        let mut b = PdfBuilder::new();
        let run = TextRun {
            x: 56.0,
            y: 780.0,
            size: 11.0,
            face: FontFace::Regular,
            text: "Hello".into(),
        };
        b.add_text_page(std::slice::from_ref(&run));
        b.add_text_page(&[run]);
        let bytes = b.finish();
        assert_eq!(count(&bytes, b"/Subtype /Type1"), 4);
        assert_eq!(count(&bytes, b"/Helvetica-BoldOblique"), 1);
        assert_eq!(count(&bytes, b"/Count 2"), 1);
    }

    #[test]
    fn wide_image_fills_width() {
        let (w, h) = fit_to_page(1000, 500);
        assert!((w - A4_WIDTH_PT).abs() < 0.01);
        assert!((h - A4_WIDTH_PT / 2.0).abs() < 0.01);
    }

    #[test]
    fn tall_image_is_capped_at_page_height() {
        let (w, h) = fit_to_page(100, 1000);
        assert!((h - A4_HEIGHT_PT).abs() < 0.01);
        assert!(w < A4_WIDTH_PT);
        assert!((w / h - 0.1).abs() < 0.001);
    }

    #[test]
    fn win_ansi_maps_latin1_and_punctuation() {
        assert_eq!(encode_win_ansi("Aé"), vec![b'A', 0xE9]);
        assert_eq!(encode_win_ansi("“x”—€"), vec![0x93, b'x', 0x94, 0x97, 0x80]);
        assert_eq!(encode_win_ansi("漢\t"), vec![b'?', b' ']);
    }

    #[test]
    fn bold_text_is_wider() {
        let r = text_width("Heading", 12.0, FontFace::Regular);
        let b = text_width("Heading", 12.0, FontFace::Bold);
        assert!(b > r);
        assert_eq!(text_width("", 12.0, FontFace::Regular), 0.0);
    }
}
