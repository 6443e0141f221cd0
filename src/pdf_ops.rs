//! PDF high-level operations module
//!
//! Merge, split, rotate, remove pages, add text and watermark. Each operation
//! decodes its inputs, builds a new page sequence from selected, transformed
//! and composited copies of the source pages, and encodes the result. An
//! operation either returns a complete result or fails; nothing partial is
//! ever produced.
//!
//! Every byte-level operation has a document-level twin (`*_document`) that
//! skips the codec, which is what the property tests exercise.

use crate::codec::{LopdfCodec, PageCodec};
use crate::composite::composite;
use crate::config::EditorConfig;
use crate::content::{ContentGenerator, TextOverlayRenderer, TextRun};
use crate::error::{EditError, Result};
use crate::model::{Document, Page};
use crate::params::{TextEdit, group_edits};
use crate::select::{PageSet, SelectionRule, select, select_indexed};
use crate::transform;
use tracing::info;

/// One single-page document produced by [`PdfEditor::split`].
#[derive(Debug, Clone)]
pub struct SplitOutput {
    /// `<prefix>_page_<N>.pdf`, `N` being the 1-based original page number.
    pub name: String,
    /// 0-based index of the page in the source document.
    pub source_index: usize,
    pub bytes: Vec<u8>,
}

/// File name for a split page.
pub fn split_file_name(prefix: &str, source_index: usize) -> String {
    format!("{}_page_{}.pdf", prefix, source_index + 1)
}

/// Stateless document editor over a codec and a text overlay generator.
///
/// # Example
///
/// ```rust,no_run
/// use pdfedit::pdf_ops::PdfEditor;
///
/// let editor: PdfEditor = PdfEditor::default();
/// let a = std::fs::read("a.pdf").unwrap();
/// let b = std::fs::read("b.pdf").unwrap();
/// let merged = editor.merge(&[a.as_slice(), b.as_slice()]).unwrap();
/// std::fs::write("merged.pdf", merged).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PdfEditor<C = LopdfCodec, G = TextOverlayRenderer> {
    codec: C,
    generator: G,
}

impl PdfEditor {
    pub fn from_config(config: &EditorConfig) -> Self {
        PdfEditor::new(
            LopdfCodec::from_config(config),
            TextOverlayRenderer::from_config(config),
        )
    }
}

impl Default for PdfEditor {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl<C: PageCodec, G: ContentGenerator> PdfEditor<C, G> {
    pub fn new(codec: C, generator: G) -> Self {
        PdfEditor { codec, generator }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    // --- Byte-level operations ---

    /// Concatenate documents in argument order. No inputs yields a valid
    /// zero-page document.
    pub fn merge(&self, inputs: &[&[u8]]) -> Result<Vec<u8>> {
        let documents = inputs
            .iter()
            .map(|bytes| self.codec.decode(bytes))
            .collect::<Result<Vec<_>>>()?;
        let merged = self.merge_documents(&documents);
        info!(
            inputs = inputs.len(),
            pages = merged.page_count(),
            "[merge] combined documents"
        );
        self.codec.encode(&merged)
    }

    /// One single-page document per page in `[start, end)`, clamped to the
    /// document. An empty range yields no outputs.
    pub fn split(
        &self,
        input: &[u8],
        start: Option<usize>,
        end: Option<usize>,
        prefix: &str,
    ) -> Result<Vec<SplitOutput>> {
        let document = self.codec.decode(input)?;
        let outputs = self
            .split_document(&document, start, end)
            .into_iter()
            .map(|(source_index, single)| {
                Ok(SplitOutput {
                    name: split_file_name(prefix, source_index),
                    source_index,
                    bytes: self.codec.encode(&single)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        info!(
            pages = document.page_count(),
            outputs = outputs.len(),
            "[split] extracted pages"
        );
        Ok(outputs)
    }

    /// Rotate every page clockwise by `angle` (a multiple of 90, may be negative).
    pub fn rotate(&self, input: &[u8], angle: i32) -> Result<Vec<u8>> {
        let document = self.codec.decode(input)?;
        let rotated = self.rotate_document(&document, angle)?;
        info!(pages = rotated.page_count(), angle, "[rotate] rotated pages");
        self.codec.encode(&rotated)
    }

    /// Drop the pages at the given 0-based indices; unknown indices are ignored.
    pub fn remove(&self, input: &[u8], indices: &[usize]) -> Result<Vec<u8>> {
        self.remove_pages(input, &indices.iter().copied().collect())
    }

    /// Like [`PdfEditor::remove`], for a page list that may hold open-ended ranges.
    pub fn remove_pages(&self, input: &[u8], pages: &PageSet) -> Result<Vec<u8>> {
        let document = self.codec.decode(input)?;
        let kept = self.remove_pages_from_document(&document, pages);
        info!(
            before = document.page_count(),
            after = kept.page_count(),
            "[remove] removed pages"
        );
        self.codec.encode(&kept)
    }

    /// Draw one string on one page. A page index past the end leaves the
    /// document unchanged.
    pub fn add_text(&self, input: &[u8], page: usize, text: &str, x: f32, y: f32) -> Result<Vec<u8>> {
        self.apply_edits(input, &[TextEdit::new(page, text, x, y)])
    }

    /// Draw every edit, one overlay per edited page.
    pub fn apply_edits(&self, input: &[u8], edits: &[TextEdit]) -> Result<Vec<u8>> {
        let document = self.codec.decode(input)?;
        let edited = self.edit_document(&document, edits)?;
        info!(
            pages = edited.page_count(),
            edits = edits.len(),
            "[add-text] applied text edits"
        );
        self.codec.encode(&edited)
    }

    /// Stamp page 0 of `watermark` onto every page of `input`.
    pub fn watermark(&self, input: &[u8], watermark: &[u8]) -> Result<Vec<u8>> {
        let document = self.codec.decode(input)?;
        let stamp = self.codec.decode(watermark)?;
        let watermarked = self.watermark_document(&document, &stamp)?;
        info!(pages = watermarked.page_count(), "[watermark] stamped pages");
        self.codec.encode(&watermarked)
    }

    // --- Document-level operations ---

    pub fn merge_documents(&self, documents: &[Document]) -> Document {
        documents
            .iter()
            .flat_map(|doc| select(doc, &SelectionRule::all()))
            .cloned()
            .collect()
    }

    /// Selected pages, each wrapped in its own document, with source indices.
    pub fn split_document(
        &self,
        document: &Document,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Vec<(usize, Document)> {
        select_indexed(document, &SelectionRule::range(start, end))
            .into_iter()
            .map(|(index, page)| (index, Document::from_pages(vec![page.clone()])))
            .collect()
    }

    pub fn rotate_document(&self, document: &Document, angle: i32) -> Result<Document> {
        if angle % 90 != 0 {
            return Err(EditError::Validation(format!(
                "rotation must be a multiple of 90 degrees, got {}",
                angle
            )));
        }
        Ok(document
            .pages()
            .iter()
            .map(|page| transform::rotate(page.clone(), angle))
            .collect())
    }

    pub fn remove_from_document(&self, document: &Document, indices: &[usize]) -> Document {
        self.remove_pages_from_document(document, &indices.iter().copied().collect())
    }

    pub fn remove_pages_from_document(&self, document: &Document, pages: &PageSet) -> Document {
        let rule = SelectionRule::exclude_set(pages.clone());
        select(document, &rule).into_iter().cloned().collect()
    }

    pub fn edit_document(&self, document: &Document, edits: &[TextEdit]) -> Result<Document> {
        let mut grouped = group_edits(edits);
        document
            .pages()
            .iter()
            .enumerate()
            .map(|(index, page)| match grouped.remove(&index) {
                Some(runs) => self.overlay_text(page, &runs),
                None => Ok(page.clone()),
            })
            .collect()
    }

    pub fn watermark_document(&self, document: &Document, watermark: &Document) -> Result<Document> {
        let stamp = watermark.page(0).ok_or_else(|| {
            EditError::Validation("watermark document has no pages".into())
        })?;
        document
            .pages()
            .iter()
            .map(|page| composite(page.clone(), stamp))
            .collect()
    }

    fn overlay_text(&self, page: &Page, runs: &[TextRun]) -> Result<Page> {
        let overlay = self.generator.render(page.media_box, runs)?;
        composite(page.clone(), &overlay)
    }
}
