//! Operation parameters supplied by callers.

use crate::content::TextRun;
use crate::error::{EditError, Result};
use crate::select::PageSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A string to draw on one page, in PDF points from the bottom-left corner.
///
/// JSON form: `{"page": 0, "text": "Approved", "x": 100, "y": 750}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEdit {
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl TextEdit {
    pub fn new(page: usize, text: impl Into<String>, x: f32, y: f32) -> Self {
        TextEdit {
            page,
            text: text.into(),
            x,
            y,
        }
    }
}

pub fn parse_edits_json(json: &str) -> Result<Vec<TextEdit>> {
    serde_json::from_str(json)
        .map_err(|e| EditError::Validation(format!("malformed text edits: {}", e)))
}

/// Group edits by target page, keeping the given order within each page.
pub fn group_edits(edits: &[TextEdit]) -> BTreeMap<usize, Vec<TextRun>> {
    let mut grouped: BTreeMap<usize, Vec<TextRun>> = BTreeMap::new();
    for edit in edits {
        grouped
            .entry(edit.page)
            .or_default()
            .push(TextRun::new(edit.text.clone(), edit.x, edit.y));
    }
    grouped
}

fn page_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"^(\d+)(?:\s*-\s*(\d+))?$").expect("valid page token regex"))
}

/// Parse a 0-based page list such as `"0, 2, 5-7"` (ranges inclusive).
///
/// Ranges are kept as ranges; indices past the end of a document are simply
/// never matched.
pub fn parse_page_list(input: &str) -> Result<PageSet> {
    let mut pages = PageSet::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let caps = page_token()
            .captures(token)
            .ok_or_else(|| EditError::Validation(format!("invalid page index '{}'", token)))?;
        let first = parse_index(&caps[1])?;
        let last = match caps.get(2) {
            Some(m) => parse_index(m.as_str())?,
            None => first,
        };
        if last < first {
            return Err(EditError::Validation(format!(
                "page range '{}' runs backwards",
                token
            )));
        }
        pages.insert_range(first..=last);
    }
    Ok(pages)
}

fn parse_index(digits: &str) -> Result<usize> {
    digits
        .parse::<usize>()
        .map_err(|_| EditError::Validation(format!("page index '{}' is too large", digits)))
}
