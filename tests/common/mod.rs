use lopdf::{Dictionary, Object, Stream};
use pdfedit::Document;
use pdfedit::codec::{LopdfCodec, PageCodec};
use std::path::PathBuf;
use std::process::Command;

/// Runs the pre-built binary directly so parallel tests do not contend for
/// the build lock.
pub fn run_pdfedit(args: &[&str]) -> (String, String, bool) {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_pdfedit"));

    let output = Command::new(&bin)
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("Failed to execute pdfedit");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// A fresh `target/test_output/<label>` directory.
pub fn output_dir(label: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target/test_output")
        .join(label);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A Letter-size PDF with one page per label, each drawing its label in
/// Helvetica bound to `/F1`.
pub fn labelled_pdf(labels: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut kids = Vec::new();
    for label in labels {
        let content = format!("BT /F1 18 Tf 72 700 Td ({}) Tj ET", label).into_bytes();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let resources = Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]);
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
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

/// Writes `labelled_pdf(labels)` to `path` and returns the path as a string.
pub fn write_fixture(path: &PathBuf, labels: &[&str]) -> String {
    std::fs::write(path, labelled_pdf(labels)).unwrap();
    path.to_string_lossy().into_owned()
}

pub fn decode(path: &PathBuf) -> Document {
    let bytes = std::fs::read(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    LopdfCodec::default().decode(&bytes).unwrap()
}

/// Decoded content of every page, lossily as text.
pub fn page_texts(document: &Document) -> Vec<String> {
    document
        .pages()
        .iter()
        .map(|p| String::from_utf8_lossy(&p.content).into_owned())
        .collect()
}
