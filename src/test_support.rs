//! Fixtures shared by the unit tests.

use crate::model::{Document, Page, Rectangle};
use lopdf::{Dictionary, Object, Stream};

/// `{ /Font { /<alias> <<Type1 font>> } }`
pub fn font_resources(alias: &str, base_font: &str) -> Dictionary {
    let font = Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
    ]);
    Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([(alias, Object::Dictionary(font))])),
    )])
}

/// A Letter page writing `text` with `/F1` bound to Times-Roman.
pub fn text_page(text: &str) -> Page {
    Page::new(
        Rectangle::letter(),
        format!("BT /F1 24 Tf 72 720 Td ({}) Tj ET", text).into_bytes(),
        font_resources("F1", "Times-Roman"),
    )
}

/// Pages whose content is `page 0`, `page 1`, ...
pub fn numbered_document(count: usize) -> Document {
    (0..count)
        .map(|i| Page::new(Rectangle::letter(), format!("page {}", i).into_bytes(), Dictionary::new()))
        .collect()
}

/// An A4 PDF with one page per text. MediaBox and Resources sit on the
/// Pages node so decoding has to follow inheritance.
pub fn sample_pdf(texts: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for text in texts {
        let content = format!("BT /F1 24 Tf 72 720 Td ({}) Tj ET", text).into_bytes();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ]),
            ),
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
