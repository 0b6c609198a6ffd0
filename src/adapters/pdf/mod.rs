//! PDF adapter: Implementation of ReportRenderer using printpdf.
//!
//! Produces a single A4 page with a solid background, the report text in a
//! built-in Helvetica face, and lines wrapped by measured glyph width. Line spacing shrinks
//! when needed so the whole report always fits on the one page.
//!
//! # Text encoding
//!
//! Built-in PDF fonts only cover the WinAnsi (Windows-1252) character set.
//! Every other character is replaced with `?` before layout, so rendering
//! never fails on unusual input such as emoji in a patient name.

use std::io::BufWriter;

use printpdf::path::PaintMode;
use printpdf::{BuiltinFont, Color, Mm, PdfDocument, Rect, Rgb};

use crate::domain::ClinicalReport;
use crate::ports::{RenderError, ReportRenderer};

/// Substitute for characters the font encoding cannot represent.
pub const FALLBACK_CHAR: char = '?';

/// Windows-1252 code points 0x80-0x9F that map outside Latin-1.
const WINANSI_EXTRAS: [char; 27] = [
    '\u{20AC}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{017D}', '\u{2018}',
    '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}',
    '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{017E}', '\u{0178}',
];

fn is_winansi(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{A0}'..='\u{FF}') || WINANSI_EXTRAS.contains(&c)
}

/// Replace every character outside WinAnsi with [`FALLBACK_CHAR`].
#[must_use]
pub fn to_winansi(text: &str) -> String {
    text.chars()
        .map(|c| if is_winansi(c) { c } else { FALLBACK_CHAR })
        .collect()
}

/// Helvetica advance widths (1/1000 em) for ASCII 0x20-0x7E, from the AFM.
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '-'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'-'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'-'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'-'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'-'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'-'~'
];

/// Upper bound for every non-ASCII WinAnsi glyph in Helvetica.
const WIDEST_NON_ASCII: u16 = 1000;

/// 1 pt in mm.
const PT_TO_MM: f32 = 0.352_778;

/// Advance width of `c` in em.
fn glyph_width(c: char) -> f32 {
    let units = match u32::from(c) {
        code @ 0x20..=0x7E => HELVETICA_ASCII_WIDTHS[(code - 0x20) as usize],
        _ => WIDEST_NON_ASCII,
    };
    f32::from(units) / 1000.0
}

fn text_width_em(text: &str) -> f32 {
    text.chars().map(glyph_width).sum()
}

/// Rendered width of `text` at `font_size` points.
#[must_use]
pub fn text_width(text: &str, font_size: f32) -> Mm {
    Mm(text_width_em(text) * font_size * PT_TO_MM)
}

/// Page appearance. Defaults match the clinic's report template.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStyle {
    pub page_width: Mm,
    pub page_height: Mm,
    pub margin: Mm,
    /// Background fill (RGB 0-255)
    pub background: (u8, u8, u8),
    /// Text color (RGB 0-255)
    pub text_color: (u8, u8, u8),
    pub font_size: f32,
    /// Preferred baseline-to-baseline distance.
    pub line_height: Mm,
}

impl PdfStyle {
    /// Width available to a line between the side margins.
    #[must_use]
    pub fn text_column(&self) -> Mm {
        Mm(self.page_width.0 - 2.0 * self.margin.0)
    }
}

impl Default for PdfStyle {
    fn default() -> Self {
        Self {
            page_width: Mm(210.0),
            page_height: Mm(297.0),
            margin: Mm(10.0),
            background: (139, 0, 0), // Dark red (#8B0000)
            text_color: (0, 0, 0),
            font_size: 11.0,
            line_height: Mm(6.0),
        }
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

/// One line of text positioned on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Baseline, measured from the bottom edge.
    pub y: Mm,
}

/// Wrap, encode and position the report lines.
///
/// Every line fits the text column and every baseline stays inside the
/// vertical margins.
#[must_use]
pub fn layout(report: &ClinicalReport, style: &PdfStyle) -> Vec<PlacedLine> {
    let max_em = style.text_column().0 / (style.font_size * PT_TO_MM);
    let lines: Vec<String> = report
        .lines()
        .iter()
        .flat_map(|line| wrap_text(&to_winansi(line), max_em))
        .collect();

    // The first baseline sits one font height below the top margin.
    let ascent = style.font_size * PT_TO_MM;
    let top = style.page_height.0 - style.margin.0 - ascent;
    let usable = top - style.margin.0;
    let step = match lines.len() {
        0 | 1 => style.line_height.0,
        n => style.line_height.0.min(usable / (n - 1) as f32),
    };

    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| PlacedLine {
            text,
            y: Mm(top - step * i as f32),
        })
        .collect()
}

/// Greedy word wrap to `max_em`. Words wider than a full line are split
/// between characters. Blank input yields one blank line.
fn wrap_text(text: &str, max_em: f32) -> Vec<String> {
    let space = glyph_width(' ');
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_em = 0.0f32;

    for piece in text.split_whitespace().flat_map(|word| split_word(word, max_em)) {
        let piece_em = text_width_em(&piece);
        if !current.is_empty() && current_em + space + piece_em > max_em {
            lines.push(std::mem::take(&mut current));
            current_em = 0.0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_em += space;
        }
        current.push_str(&piece);
        current_em += piece_em;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Chunks of `word`, each no wider than `max_em` (a single glyph always
/// makes a chunk, however narrow the line).
fn split_word(word: &str, max_em: f32) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut chunk_em = 0.0f32;

    for c in word.chars() {
        let w = glyph_width(c);
        if !chunk.is_empty() && chunk_em + w > max_em {
            chunks.push(std::mem::take(&mut chunk));
            chunk_em = 0.0;
        }
        chunk.push(c);
        chunk_em += w;
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

/// printpdf-backed renderer.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    style: PdfStyle,
}

impl PdfRenderer {
    #[must_use]
    pub fn new(style: PdfStyle) -> Self {
        Self { style }
    }

    #[must_use]
    pub fn style(&self) -> &PdfStyle {
        &self.style
    }
}

impl ReportRenderer for PdfRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn render(&self, report: &ClinicalReport) -> Result<Vec<u8>, RenderError> {
        let style = &self.style;
        let (doc, page1, layer1) = PdfDocument::new(
            crate::domain::report::REPORT_TITLE,
            style.page_width,
            style.page_height,
            "Layer 1",
        );
        let layer = doc.get_page(page1).get_layer(layer1);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Font(e.to_string()))?;

        layer.set_fill_color(rgb(style.background));
        layer.add_rect(
            Rect::new(Mm(0.0), Mm(0.0), style.page_width, style.page_height)
                .with_mode(PaintMode::Fill),
        );

        layer.set_fill_color(rgb(style.text_color));
        let placed = layout(report, style);
        for line in placed.iter().filter(|l| !l.text.is_empty()) {
            layer.use_text(line.text.as_str(), style.font_size, style.margin, line.y, &font);
        }

        tracing::debug!("Laid out {} report lines on one page", placed.len());

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| RenderError::Serialization(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| RenderError::Serialization(format!("PDF buffer error: {e}")))
    }
}
