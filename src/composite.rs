//! Page compositing.
//!
//! Merges an overlay page into a base page so both render together. Resource
//! names are local to a content stream, so when both pages define the same
//! name in a category the overlay's entry is renamed and every operand in the
//! overlay content that refers to it is rewritten before the streams are
//! joined. Rewriting patches the name tokens in place; every other byte of
//! the overlay, inline image data included, is copied unchanged.

use crate::error::{EditError, Result};
use crate::model::Page;
use lopdf::{Dictionary, Object};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

/// Which operand of an operator carries a resource name.
#[derive(Clone, Copy)]
enum Operand {
    First,
    Second,
    Last,
}

/// Resource category and operand position referenced by a content operator.
fn resource_operand(operator: &[u8]) -> Option<(&'static [u8], Operand)> {
    let entry: (&'static [u8], Operand) = match operator {
        b"Tf" => (b"Font", Operand::First),
        b"Do" => (b"XObject", Operand::First),
        b"gs" => (b"ExtGState", Operand::First),
        b"cs" | b"CS" => (b"ColorSpace", Operand::First),
        b"scn" | b"SCN" => (b"Pattern", Operand::Last),
        b"sh" => (b"Shading", Operand::First),
        b"BDC" | b"DP" => (b"Properties", Operand::Second),
        _ => return None,
    };
    Some(entry)
}

/// Overlay resource renames for a single composite call: category -> old -> new.
#[derive(Debug, Default)]
struct RenameMap {
    entries: BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl RenameMap {
    fn insert(&mut self, category: &[u8], from: Vec<u8>, to: Vec<u8>) {
        self.entries.entry(category.to_vec()).or_default().insert(from, to);
    }

    fn get(&self, category: &[u8], name: &[u8]) -> Option<&Vec<u8>> {
        self.entries.get(category)?.get(name)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }
}

/// Paint `overlay` on top of `base`.
///
/// The result keeps the base page's media box, crop box and rotation. Its
/// content is the base content followed by the overlay content, each wrapped
/// in its own `q`/`Q` pair so state left over by the base cannot leak into the
/// overlay. The overlay's pieces are copied, never shared.
pub fn composite(mut base: Page, overlay: &Page) -> Result<Page> {
    let renames = merge_resources(&mut base.resources, &overlay.resources);

    let overlay_content = if renames.is_empty() {
        overlay.content.clone()
    } else {
        debug!(renamed = renames.len(), "renamed colliding overlay resources");
        rename_operands(&overlay.content, &renames)?
    };

    let mut content = Vec::with_capacity(base.content.len() + overlay_content.len() + 12);
    content.extend_from_slice(b"q\n");
    content.extend_from_slice(&base.content);
    content.extend_from_slice(b"\nQ\nq\n");
    content.extend_from_slice(&overlay_content);
    content.extend_from_slice(b"\nQ\n");
    base.content = content;
    Ok(base)
}

/// Union `overlay` into `base`, renaming overlay entries whose name is taken.
fn merge_resources(base: &mut Dictionary, overlay: &Dictionary) -> RenameMap {
    let mut renames = RenameMap::default();

    for (category, value) in overlay.iter() {
        match value {
            Object::Array(items) if category.as_slice() == b"ProcSet" => {
                let mut merged = match base.get(b"ProcSet") {
                    Ok(Object::Array(existing)) => existing.clone(),
                    _ => Vec::new(),
                };
                for item in items {
                    if !merged.iter().any(|m| same_name(m, item)) {
                        merged.push(item.clone());
                    }
                }
                base.set("ProcSet", Object::Array(merged));
            }
            Object::Dictionary(entries) => {
                if !matches!(base.get(category), Ok(Object::Dictionary(_))) {
                    base.set(category.clone(), Object::Dictionary(entries.clone()));
                    continue;
                }
                let Ok(base_entries) = base.get_mut(category).and_then(Object::as_dict_mut) else {
                    continue;
                };
                for (name, resource) in entries.iter() {
                    if base_entries.has(name) {
                        let fresh = unique_name(name, base_entries, entries);
                        debug!(
                            category = %String::from_utf8_lossy(category),
                            from = %String::from_utf8_lossy(name),
                            to = %String::from_utf8_lossy(&fresh),
                            "resource name collision"
                        );
                        base_entries.set(fresh.clone(), resource.clone());
                        renames.insert(category, name.clone(), fresh);
                    } else {
                        base_entries.set(name.clone(), resource.clone());
                    }
                }
            }
            other => {
                if !base.has(category) {
                    base.set(category.clone(), other.clone());
                }
            }
        }
    }

    renames
}

fn same_name(a: &Object, b: &Object) -> bool {
    matches!((a, b), (Object::Name(x), Object::Name(y)) if x == y)
}

/// Smallest `<name>_<n>` unused by either page in this category.
fn unique_name(name: &[u8], base: &Dictionary, overlay: &Dictionary) -> Vec<u8> {
    let mut n = 1u32;
    loop {
        let mut candidate = name.to_vec();
        candidate.extend_from_slice(format!("_{}", n).as_bytes());
        if !base.has(&candidate) && !overlay.has(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

// --- Operand rewriting ---

const WHITESPACE: &[u8] = b"\0\t\n\x0C\r ";
const DELIMITERS: &[u8] = b"()<>[]{}/%";

fn is_whitespace(byte: u8) -> bool {
    WHITESPACE.contains(&byte)
}

fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !DELIMITERS.contains(&byte)
}

/// A top-level name operand: where its bytes sit (after the `/`) and its
/// decoded value.
struct NameToken {
    span: Range<usize>,
    name: Vec<u8>,
}

/// Replacement names for byte spans of the content, in stream order.
type Patches = Vec<(Range<usize>, Vec<u8>)>;

fn rename_operands(content: &[u8], renames: &RenameMap) -> Result<Vec<u8>> {
    let patches = find_renamed_operands(content, renames)?;
    let mut out = Vec::with_capacity(content.len() + patches.len() * 4);
    let mut cursor = 0;
    for (span, name) in patches {
        out.extend_from_slice(&content[cursor..span.start]);
        out.extend_from_slice(&encode_name(&name));
        cursor = span.end;
    }
    out.extend_from_slice(&content[cursor..]);
    Ok(out)
}

/// Walk the content tokens and collect every resource operand to rename.
fn find_renamed_operands(content: &[u8], renames: &RenameMap) -> Result<Patches> {
    let mut patches = Patches::new();
    let mut operands: Vec<Option<NameToken>> = Vec::new();
    // Depth inside arrays and dictionaries; their members are not operands.
    let mut nesting = 0usize;
    let mut pos = 0;

    while pos < content.len() {
        match content[pos] {
            byte if is_whitespace(byte) => pos += 1,
            b'%' => pos = skip_comment(content, pos),
            b'(' => {
                pos = skip_literal_string(content, pos)?;
                if nesting == 0 {
                    operands.push(None);
                }
            }
            b'<' if content.get(pos + 1) == Some(&b'<') => {
                nesting += 1;
                pos += 2;
            }
            b'>' if content.get(pos + 1) == Some(&b'>') => {
                nesting = nesting.saturating_sub(1);
                pos += 2;
                if nesting == 0 {
                    operands.push(None);
                }
            }
            b'<' => {
                pos = skip_hex_string(content, pos)?;
                if nesting == 0 {
                    operands.push(None);
                }
            }
            b'[' => {
                nesting += 1;
                pos += 1;
            }
            b']' => {
                nesting = nesting.saturating_sub(1);
                pos += 1;
                if nesting == 0 {
                    operands.push(None);
                }
            }
            b'/' => {
                let end = token_end(content, pos + 1);
                if nesting == 0 {
                    operands.push(Some(NameToken {
                        span: pos + 1..end,
                        name: decode_name(&content[pos + 1..end]),
                    }));
                }
                pos = end;
            }
            b')' | b'>' | b'{' | b'}' => pos += 1,
            _ => {
                let end = token_end(content, pos);
                let word = &content[pos..end];
                pos = end;
                if nesting > 0 {
                    continue;
                }
                if is_operand_word(word) {
                    operands.push(None);
                    continue;
                }
                if word == b"BI" {
                    pos = scan_inline_image(content, pos, renames, &mut patches)?;
                } else if let Some((category, position)) = resource_operand(word) {
                    let operand = match position {
                        Operand::First => operands.first(),
                        Operand::Second => operands.get(1),
                        Operand::Last => operands.last(),
                    };
                    if let Some(Some(token)) = operand {
                        if let Some(fresh) = renames.get(category, &token.name) {
                            patches.push((token.span.clone(), fresh.clone()));
                        }
                    }
                }
                operands.clear();
            }
        }
    }

    Ok(patches)
}

/// Skip an inline image dictionary and its data, starting just after `BI`.
/// A `/CS` (or `/ColorSpace`) value naming a renamed color space is patched.
/// Returns the position after `EI`.
fn scan_inline_image(
    content: &[u8],
    mut pos: usize,
    renames: &RenameMap,
    patches: &mut Patches,
) -> Result<usize> {
    let mut color_space_key = false;
    while pos < content.len() {
        match content[pos] {
            byte if is_whitespace(byte) => pos += 1,
            b'%' => pos = skip_comment(content, pos),
            b'/' => {
                let end = token_end(content, pos + 1);
                let name = decode_name(&content[pos + 1..end]);
                if color_space_key {
                    if let Some(fresh) = renames.get(b"ColorSpace", &name) {
                        patches.push((pos + 1..end, fresh.clone()));
                    }
                    color_space_key = false;
                } else {
                    color_space_key = name == b"CS" || name == b"ColorSpace";
                }
                pos = end;
            }
            b'(' => {
                pos = skip_literal_string(content, pos)?;
                color_space_key = false;
            }
            b'<' if content.get(pos + 1) != Some(&b'<') => {
                pos = skip_hex_string(content, pos)?;
                color_space_key = false;
            }
            byte if !is_regular(byte) => {
                pos += 1;
                color_space_key = false;
            }
            _ => {
                let end = token_end(content, pos);
                if &content[pos..end] == b"ID" {
                    // One whitespace byte separates ID from the data.
                    return inline_image_end(content, end + 1);
                }
                pos = end;
                color_space_key = false;
            }
        }
    }
    Err(EditError::Codec("inline image without ID".into()))
}

/// Position just past the `EI` that ends inline image data starting at `data`.
fn inline_image_end(content: &[u8], data: usize) -> Result<usize> {
    let mut pos = data.min(content.len());
    while pos + 2 <= content.len() {
        let preceded = pos == 0 || is_whitespace(content[pos - 1]);
        let followed = content.get(pos + 2).is_none_or(|b| !is_regular(*b));
        if &content[pos..pos + 2] == b"EI" && preceded && followed {
            return Ok(pos + 2);
        }
        pos += 1;
    }
    Err(EditError::Codec("inline image data without EI".into()))
}

fn token_end(content: &[u8], start: usize) -> usize {
    content[start..]
        .iter()
        .position(|b| !is_regular(*b))
        .map_or(content.len(), |offset| start + offset)
}

fn is_operand_word(word: &[u8]) -> bool {
    matches!(word, b"true" | b"false" | b"null")
        || word
            .first()
            .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'))
}

fn skip_comment(content: &[u8], start: usize) -> usize {
    content[start..]
        .iter()
        .position(|b| matches!(b, b'\n' | b'\r'))
        .map_or(content.len(), |offset| start + offset)
}

fn skip_literal_string(content: &[u8], start: usize) -> Result<usize> {
    let mut depth = 0usize;
    let mut pos = start;
    while pos < content.len() {
        match content[pos] {
            b'\\' => pos += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos + 1);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    Err(EditError::Codec("unterminated string in overlay content".into()))
}

fn skip_hex_string(content: &[u8], start: usize) -> Result<usize> {
    content[start..]
        .iter()
        .position(|b| *b == b'>')
        .map(|offset| start + offset + 1)
        .ok_or_else(|| EditError::Codec("unterminated hex string in overlay content".into()))
}

/// Resolve `#xx` escapes in a name token.
fn decode_name(raw: &[u8]) -> Vec<u8> {
    let mut name = Vec::with_capacity(raw.len());
    let mut pos = 0;
    while pos < raw.len() {
        if raw[pos] == b'#' {
            let escaped = raw
                .get(pos + 1..pos + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = escaped {
                name.push(byte);
                pos += 3;
                continue;
            }
        }
        name.push(raw[pos]);
        pos += 1;
    }
    name
}

/// Write a name's bytes as a token body, escaping what may not appear bare.
fn encode_name(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    for &byte in name {
        if is_regular(byte) && byte != b'#' && (0x21..=0x7E).contains(&byte) {
            out.push(byte);
        } else {
            out.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
    out
}
