//! PDF codec: bytes to [`Document`] and back.
//!
//! [`LopdfCodec`] parses with `lopdf`, walks the page tree in order and
//! flattens every page into a self-contained [`Page`]: inherited attributes are
//! looked up through the `Parent` chain, content streams are decompressed and
//! concatenated, and resources are resolved into an owned object tree.
//! Encoding builds a fresh page tree from scratch; identical streams (fonts,
//! images, ICC profiles shared by many pages) are written once.

use crate::config::EditorConfig;
use crate::error::{EditError, Result};
use crate::model::{Document, Page, Rectangle};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

/// Limit when walking `Parent` chains; guards against looping page trees.
const MAX_TREE_DEPTH: usize = 32;

static NULL: Object = Object::Null;

/// Decode and encode whole documents.
pub trait PageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Document>;
    fn encode(&self, document: &Document) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct LopdfCodec {
    pdf_version: String,
    compress: bool,
}

impl LopdfCodec {
    pub fn new() -> Self {
        Self::from_config(&EditorConfig::default())
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        LopdfCodec {
            pdf_version: config.pdf_version.clone(),
            compress: config.compress,
        }
    }
}

impl Default for LopdfCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCodec for LopdfCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        let source = lopdf::Document::load_mem(bytes)
            .map_err(|e| EditError::codec("failed to load PDF", e))?;

        if source.trailer.has(b"Encrypt") {
            return Err(EditError::Codec("encrypted documents are not supported".into()));
        }

        let mut document = Document::new();
        for (number, page_id) in source.get_pages() {
            let page = decode_page(&source, page_id).map_err(|e| match e {
                EditError::Codec(msg) => EditError::Codec(format!("page {}: {}", number, msg)),
                other => other,
            })?;
            document.push(page);
        }

        debug!(pages = document.page_count(), "decoded document");
        Ok(document)
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        let mut out = lopdf::Document::with_version(self.pdf_version.as_str());
        let pages_id = out.new_object_id();
        let mut kids = Vec::with_capacity(document.page_count());
        let mut streams = StreamPool::default();

        for page in document.pages() {
            let content_id = out.add_object(Stream::new(Dictionary::new(), page.content.clone()));
            let resources =
                externalize(&mut out, &mut streams, Object::Dictionary(page.resources.clone()));

            let mut dict = Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("MediaBox", rect_object(&page.media_box)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", resources),
            ]);
            if let Some(crop_box) = &page.crop_box {
                dict.set("CropBox", rect_object(crop_box));
            }
            if page.rotation() != 0 {
                dict.set("Rotate", Object::Integer(i64::from(page.rotation())));
            }
            kids.push(Object::Reference(out.add_object(dict)));
        }

        let count = kids.len() as i64;
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        out.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = out.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        out.trailer.set("Root", Object::Reference(catalog_id));

        if self.compress {
            out.compress();
        }

        let mut buffer = Vec::new();
        out.save_to(&mut buffer)
            .map_err(|e| EditError::codec("failed to write PDF", e))?;
        debug!(
            pages = count,
            shared_streams = streams.len(),
            bytes = buffer.len(),
            "encoded document"
        );
        Ok(buffer)
    }
}

// --- Decoding ---

fn decode_page(doc: &lopdf::Document, page_id: ObjectId) -> Result<Page> {
    let dict = doc
        .get_dictionary(page_id)
        .map_err(|e| EditError::codec("page object is not a dictionary", e))?;

    let media_box = match inherited(doc, dict, b"MediaBox").and_then(|o| rect_from(doc, o)) {
        Some(rect) => rect,
        None => {
            warn!(?page_id, "page has no usable MediaBox, assuming US Letter");
            Rectangle::letter()
        }
    };
    let crop_box = inherited(doc, dict, b"CropBox").and_then(|o| rect_from(doc, o));
    let rotation = inherited(doc, dict, b"Rotate")
        .and_then(|o| match deref(doc, o) {
            Object::Integer(i) => Some(*i),
            Object::Real(r) => Some(*r as i64),
            _ => None,
        })
        .unwrap_or(0);

    let resources = match inherited(doc, dict, b"Resources") {
        Some(obj) => match resolve(doc, obj, &mut Vec::new()) {
            Object::Dictionary(d) => d,
            _ => Dictionary::new(),
        },
        None => Dictionary::new(),
    };

    let mut page = Page::new(media_box, page_content(doc, page_id)?, resources);
    page.crop_box = crop_box;
    page.set_rotation((rotation % 360) as i32);
    Ok(page)
}

/// Look up an inheritable page attribute, walking up the page tree.
fn inherited<'a>(doc: &'a lopdf::Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        current = match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => doc.get_dictionary(*parent_id).ok()?,
            _ => return None,
        };
    }
    None
}

fn page_content(doc: &lopdf::Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    for content_id in doc.get_page_contents(page_id) {
        let stream = doc
            .get_object(content_id)
            .and_then(Object::as_stream)
            .map_err(|e| EditError::codec("unreadable content stream", e))?;
        let bytes = if stream.dict.has(b"Filter") {
            stream
                .decompressed_content()
                .map_err(|e| EditError::codec("unsupported content stream filter", e))?
        } else {
            stream.content.clone()
        };
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend_from_slice(&bytes);
    }
    Ok(content)
}

fn deref<'a>(doc: &'a lopdf::Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(&NULL),
        other => other,
    }
}

fn number(doc: &lopdf::Document, obj: &Object) -> Option<f32> {
    match deref(doc, obj) {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rect_from(doc: &lopdf::Document, obj: &Object) -> Option<Rectangle> {
    let Object::Array(values) = deref(doc, obj) else {
        return None;
    };
    if values.len() != 4 {
        return None;
    }
    let v: Vec<f32> = values.iter().filter_map(|o| number(doc, o)).collect();
    if v.len() != 4 {
        return None;
    }
    // Corners may be given in any order.
    Some(Rectangle::new(
        v[0].min(v[2]),
        v[1].min(v[3]),
        v[0].max(v[2]),
        v[1].max(v[3]),
    ))
}

/// Deep-copy an object, replacing indirect references with their targets.
///
/// `stack` holds the references currently being expanded; a reference back
/// into it is a cycle and becomes `null`.
fn resolve(doc: &lopdf::Document, obj: &Object, stack: &mut Vec<ObjectId>) -> Object {
    match obj {
        Object::Reference(id) => {
            if stack.contains(id) {
                warn!(object = ?id, "reference cycle in resources, replacing with null");
                return Object::Null;
            }
            let Ok(target) = doc.get_object(*id) else {
                warn!(object = ?id, "dangling reference in resources");
                return Object::Null;
            };
            stack.push(*id);
            let resolved = resolve(doc, target, stack);
            stack.pop();
            resolved
        }
        Object::Dictionary(dict) => Object::Dictionary(resolve_dict(doc, dict, stack)),
        Object::Array(items) => {
            Object::Array(items.iter().map(|item| resolve(doc, item, stack)).collect())
        }
        Object::Stream(stream) => {
            let mut copy = stream.clone();
            copy.dict = resolve_dict(doc, &stream.dict, stack);
            Object::Stream(copy)
        }
        other => other.clone(),
    }
}

fn resolve_dict(doc: &lopdf::Document, dict: &Dictionary, stack: &mut Vec<ObjectId>) -> Dictionary {
    let mut out = Dictionary::new();
    for (key, value) in dict.iter() {
        if key.as_slice() == b"Parent" {
            continue;
        }
        out.set(key.clone(), resolve(doc, value, stack));
    }
    out
}

// --- Encoding ---

/// Streams already written by one `encode` call, bucketed by content hash.
#[derive(Default)]
struct StreamPool {
    by_hash: HashMap<u64, Vec<ObjectId>>,
}

impl StreamPool {
    /// Id of an identical stream already in `out`, or of `stream` newly added.
    fn intern(&mut self, out: &mut lopdf::Document, stream: Stream) -> ObjectId {
        let object = Object::Stream(stream);
        let mut hasher = DefaultHasher::new();
        hash_object(&object, &mut hasher);

        let bucket = self.by_hash.entry(hasher.finish()).or_default();
        if let Some(id) = bucket.iter().find(|id| out.objects.get(*id) == Some(&object)) {
            return *id;
        }
        let id = out.add_object(object);
        bucket.push(id);
        id
    }

    fn len(&self) -> usize {
        self.by_hash.values().map(Vec::len).sum()
    }
}

fn hash_object<H: Hasher>(object: &Object, state: &mut H) {
    std::mem::discriminant(object).hash(state);
    match object {
        Object::Null => {}
        Object::Boolean(b) => b.hash(state),
        Object::Integer(i) => i.hash(state),
        Object::Real(r) => r.to_bits().hash(state),
        Object::Name(name) => name.hash(state),
        Object::String(bytes, format) => {
            bytes.hash(state);
            matches!(format, StringFormat::Hexadecimal).hash(state);
        }
        Object::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_object(item, state);
            }
        }
        Object::Dictionary(dict) => hash_dict(dict, state),
        Object::Stream(stream) => {
            hash_dict(&stream.dict, state);
            stream.content.hash(state);
        }
        Object::Reference(id) => id.hash(state),
    }
}

fn hash_dict<H: Hasher>(dict: &Dictionary, state: &mut H) {
    dict.len().hash(state);
    for (key, value) in dict.iter() {
        key.hash(state);
        hash_object(value, state);
    }
}

/// Move nested streams out into indirect objects of `out`, sharing
/// identical ones.
fn externalize(out: &mut lopdf::Document, streams: &mut StreamPool, obj: Object) -> Object {
    match obj {
        Object::Stream(mut stream) => {
            let mut dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                dict.set(key.clone(), externalize(out, streams, value.clone()));
            }
            dict.set("Length", Object::Integer(stream.content.len() as i64));
            stream.dict = dict;
            stream.start_position = None;
            Object::Reference(streams.intern(out, stream))
        }
        Object::Dictionary(dict) => {
            let mut copy = Dictionary::new();
            for (key, value) in dict.iter() {
                copy.set(key.clone(), externalize(out, streams, value.clone()));
            }
            Object::Dictionary(copy)
        }
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| externalize(out, streams, item))
                .collect(),
        ),
        other => other,
    }
}

fn number_object(value: f32) -> Object {
    if value.fract() == 0.0 && value.abs() < 1.0e9 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value)
    }
}

fn rect_object(rect: &Rectangle) -> Object {
    Object::Array(vec![
        number_object(rect.llx),
        number_object(rect.lly),
        number_object(rect.urx),
        number_object(rect.ury),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{font_resources, sample_pdf, text_page};

    #[test]
    fn test_decode_page_count_and_content() {
        let bytes = sample_pdf(&["one", "two", "three"]);
        let doc = LopdfCodec::new().decode(&bytes).unwrap();
        assert_eq!(doc.page_count(), 3);
        let content = String::from_utf8_lossy(&doc.pages()[1].content).to_string();
        assert!(content.contains("(two) Tj"));
    }

    #[test]
    fn test_decode_resolves_inherited_attributes() {
        let bytes = sample_pdf(&["a"]);
        let doc = LopdfCodec::new().decode(&bytes).unwrap();
        let page = &doc.pages()[0];
        // MediaBox and Resources live on the Pages node in the fixture.
        assert_eq!(page.media_box, Rectangle::from_size(595.0, 842.0));
        let fonts = page.resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(matches!(fonts.get(b"F1").unwrap(), Object::Dictionary(_)));
    }

    #[test]
    fn test_roundtrip_preserves_pages() {
        let original = Document::from_pages(vec![
            text_page("first").with_rotation(90),
            text_page("second").with_crop_box(Rectangle::new(10.0, 10.0, 500.0, 700.0)),
        ]);
        let codec = LopdfCodec::new();
        let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();
        assert_eq!(decoded.page_count(), 2);
        for (a, b) in original.pages().iter().zip(decoded.pages()) {
            assert!(a.same_content(b));
        }
        assert_eq!(decoded.pages()[0].rotation(), 90);
        assert_eq!(
            decoded.pages()[1].crop_box,
            Some(Rectangle::new(10.0, 10.0, 500.0, 700.0))
        );
        assert!(decoded.pages()[0].resources.get(b"Font").is_ok());
    }

    #[test]
    fn test_uncompressed_roundtrip() {
        let config = EditorConfig {
            compress: false,
            ..EditorConfig::default()
        };
        let codec = LopdfCodec::from_config(&config);
        let bytes = codec.encode(&Document::from_pages(vec![text_page("plain")])).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(String::from_utf8_lossy(&bytes).contains("(plain) Tj"));
    }

    #[test]
    fn test_empty_document_roundtrip() {
        let codec = LopdfCodec::new();
        let bytes = codec.encode(&Document::new()).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_malformed_input() {
        let result = LopdfCodec::new().decode(b"this is not a pdf");
        assert!(matches!(result, Err(EditError::Codec(_))));
    }

    #[test]
    fn test_nested_streams_are_externalized() {
        let mut resources = font_resources("F1", "Helvetica");
        let form = Stream::new(
            Dictionary::from_iter([
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Form".to_vec())),
            ]),
            b"0 0 10 10 re f".to_vec(),
        );
        resources.set(
            "XObject",
            Dictionary::from_iter([("Fm1", Object::Stream(form))]),
        );
        let page = Page::new(Rectangle::letter(), b"/Fm1 Do".to_vec(), resources);

        let codec = LopdfCodec::new();
        let decoded = codec
            .decode(&codec.encode(&Document::from_pages(vec![page])).unwrap())
            .unwrap();
        let xobjects = decoded.pages()[0].resources.get(b"XObject").unwrap().as_dict().unwrap();
        let Object::Stream(stream) = xobjects.get(b"Fm1").unwrap() else {
            panic!("form XObject was not resolved to a stream");
        };
        let body = if stream.dict.has(b"Filter") {
            stream.decompressed_content().unwrap()
        } else {
            stream.content.clone()
        };
        assert_eq!(body, b"0 0 10 10 re f");
    }

    /// `count` pages whose fonts all point at one embedded font program.
    fn shared_font_pdf(count: usize, font_program_len: usize) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let program: Vec<u8> = (0..font_program_len).map(|i| (i % 251) as u8).collect();
        let program_id = doc.add_object(Stream::new(Dictionary::new(), program));
        let descriptor_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(b"Embedded".to_vec())),
            ("FontFile2", Object::Reference(program_id)),
        ]));
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"TrueType".to_vec())),
            ("BaseFont", Object::Name(b"Embedded".to_vec())),
            ("FontDescriptor", Object::Reference(descriptor_id)),
        ]));

        let mut kids = Vec::new();
        for i in 0..count {
            let content = format!("BT /F1 12 Tf 72 720 Td (page {}) Tj ET", i).into_bytes();
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
            let resources = Dictionary::from_iter([(
                "Font",
                Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
            )]);
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Resources", Object::Dictionary(resources)),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count as i64)),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_shared_streams_written_once() {
        let input = shared_font_pdf(40, 20_000);
        let config = EditorConfig {
            compress: false,
            ..EditorConfig::default()
        };
        let codec = LopdfCodec::from_config(&config);
        let output = codec.encode(&codec.decode(&input).unwrap()).unwrap();

        // One content stream per page plus a single font program.
        let written = lopdf::Document::load_mem(&output).unwrap();
        let streams = written
            .objects
            .values()
            .filter(|o| matches!(o, Object::Stream(_)))
            .count();
        assert_eq!(streams, 41);
        assert!(output.len() < input.len() * 2, "{} vs {}", output.len(), input.len());

        let decoded = codec.decode(&output).unwrap();
        assert_eq!(decoded.page_count(), 40);
    }

    #[test]
    fn test_distinct_streams_stay_distinct() {
        let mut page_a = text_page("a");
        let mut page_b = text_page("b");
        for (page, body) in [(&mut page_a, b"1 0 0 rg".to_vec()), (&mut page_b, b"0 1 0 rg".to_vec())] {
            let form = Stream::new(Dictionary::new(), body);
            page.resources.set(
                "XObject",
                Dictionary::from_iter([("Fm1", Object::Stream(form))]),
            );
        }
        let codec = LopdfCodec::new();
        let decoded = codec
            .decode(&codec.encode(&Document::from_pages(vec![page_a, page_b])).unwrap())
            .unwrap();
        let bodies: Vec<Vec<u8>> = decoded
            .pages()
            .iter()
            .map(|p| {
                let xobjects = p.resources.get(b"XObject").unwrap().as_dict().unwrap();
                let stream = xobjects.get(b"Fm1").unwrap().as_stream().unwrap();
                if stream.dict.has(b"Filter") {
                    stream.decompressed_content().unwrap()
                } else {
                    stream.content.clone()
                }
            })
            .collect();
        assert_eq!(bodies, vec![b"1 0 0 rg".to_vec(), b"0 1 0 rg".to_vec()]);
    }

    #[test]
    fn test_reference_cycle_becomes_null() {
        let mut doc = lopdf::Document::with_version("1.5");
        let a = doc.new_object_id();
        let b = doc.add_object(Dictionary::from_iter([("Back", Object::Reference(a))]));
        doc.objects.insert(a, Object::Dictionary(Dictionary::from_iter([("Next", Object::Reference(b))])));

        let resolved = resolve(&doc, &Object::Reference(a), &mut Vec::new());
        let next = resolved.as_dict().unwrap().get(b"Next").unwrap().as_dict().unwrap();
        assert!(matches!(next.get(b"Back").unwrap(), Object::Null));
    }
}
