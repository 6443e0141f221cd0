//! Text overlay generation.
//!
//! Produces a synthetic single page that paints text strings at absolute
//! coordinates. The page is meant to be composited onto an existing page of
//! the same size.

use crate::config::EditorConfig;
use crate::error::{EditError, Result};
use crate::model::{Page, Rectangle};
use lopdf::{Dictionary, Object};

/// Resource name the overlay font is registered under.
pub const OVERLAY_FONT: &str = "F1";

/// One string to paint, anchored at its baseline start.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

impl TextRun {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        TextRun {
            text: text.into(),
            x,
            y,
        }
    }
}

/// Builds overlay pages from text runs.
pub trait ContentGenerator: Send + Sync {
    fn render(&self, media_box: Rectangle, runs: &[TextRun]) -> Result<Page>;
}

/// Draws text with one of the standard 14 Type1 fonts.
#[derive(Debug, Clone)]
pub struct TextOverlayRenderer {
    font: String,
    font_size: f32,
}

impl TextOverlayRenderer {
    pub fn new(font: impl Into<String>, font_size: f32) -> Self {
        TextOverlayRenderer {
            font: font.into(),
            font_size,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.font.clone(), config.font_size)
    }

    fn font_resources(&self) -> Dictionary {
        let font = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(self.font.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]);
        Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(OVERLAY_FONT, Object::Dictionary(font))])),
        )])
    }
}

impl Default for TextOverlayRenderer {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl ContentGenerator for TextOverlayRenderer {
    fn render(&self, media_box: Rectangle, runs: &[TextRun]) -> Result<Page> {
        if !media_box.is_finite() || media_box.width() <= 0.0 || media_box.height() <= 0.0 {
            return Err(EditError::Render(format!(
                "invalid media box {:?}",
                media_box
            )));
        }
        if let Some(run) = runs.iter().find(|r| !r.x.is_finite() || !r.y.is_finite()) {
            return Err(EditError::Render(format!(
                "non-finite coordinates ({}, {}) for text {:?}",
                run.x, run.y, run.text
            )));
        }

        let mut stream = Vec::new();
        stream.extend_from_slice(b"q\n");
        for run in runs {
            stream.extend_from_slice(b"BT\n");
            stream.extend_from_slice(format!("/{} {} Tf\n", OVERLAY_FONT, self.font_size).as_bytes());
            stream.extend_from_slice(format!("{} {} Td\n", run.x, run.y).as_bytes());
            stream.push(b'(');
            stream.extend_from_slice(&encode_pdf_literal(&run.text));
            stream.extend_from_slice(b") Tj\n");
            stream.extend_from_slice(b"ET\n");
        }
        stream.extend_from_slice(b"Q\n");

        Ok(Page::new(media_box, stream, self.font_resources()))
    }
}

/// Map a character to its WinAnsiEncoding byte.
fn winansi_encode(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80, // Euro sign
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85, // Horizontal ellipsis
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91, // Curly quotes
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95, // Bullet
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        c if (' '..='~').contains(&c) || ('\u{00A0}'..='\u{00FF}').contains(&c) => c as u8,
        '\n' | '\r' | '\t' => c as u8,
        _ => return None,
    };
    Some(byte)
}

/// Encode text as the body of a PDF literal string.
///
/// Characters WinAnsiEncoding cannot represent become `?`.
pub fn encode_pdf_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match winansi_encode(c).unwrap_or(b'?') {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\t' => out.extend_from_slice(b"\\t"),
            byte => out.push(byte),
        }
    }
    out
}
