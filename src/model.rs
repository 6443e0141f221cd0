//! In-memory page model.
//!
//! A [`Document`] is an ordered sequence of [`Page`]s. Each page owns its
//! decoded content stream and a fully resolved resource dictionary, so pages
//! can be moved between documents without dragging a shared object table
//! along. Moving a page into another document always means cloning it.

use lopdf::Dictionary;

// --- Geometry ---

/// A page rectangle in PDF points, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl Rectangle {
    pub fn new(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        Rectangle { llx, lly, urx, ury }
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Rectangle::new(0.0, 0.0, width, height)
    }

    /// US Letter, 612 x 792 points.
    pub fn letter() -> Self {
        Rectangle::from_size(612.0, 792.0)
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    pub fn is_finite(&self) -> bool {
        [self.llx, self.lly, self.urx, self.ury]
            .iter()
            .all(|v| v.is_finite())
    }
}

// --- Page ---

/// One page: content stream, resources, geometry and rotation.
#[derive(Debug, Clone)]
pub struct Page {
    pub media_box: Rectangle,
    pub crop_box: Option<Rectangle>,
    /// Decoded (filter-free) drawing instructions.
    pub content: Vec<u8>,
    /// Resource dictionary with every indirect reference resolved.
    pub resources: Dictionary,
    rotation: i32,
}

impl Page {
    pub fn new(media_box: Rectangle, content: Vec<u8>, resources: Dictionary) -> Self {
        Page {
            media_box,
            crop_box: None,
            content,
            resources,
            rotation: 0,
        }
    }

    /// An empty page of the given size.
    pub fn blank(media_box: Rectangle) -> Self {
        Page::new(media_box, Vec::new(), Dictionary::new())
    }

    pub fn with_rotation(mut self, rotation: i32) -> Self {
        self.set_rotation(rotation);
        self
    }

    pub fn with_crop_box(mut self, crop_box: Rectangle) -> Self {
        self.crop_box = Some(crop_box);
        self
    }

    /// Clockwise display rotation in degrees, always in `[0, 360)`.
    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: i32) {
        self.rotation = rotation.rem_euclid(360);
    }

    /// Content and geometry equality, ignoring resource identity.
    pub fn same_content(&self, other: &Page) -> bool {
        self.content == other.content
            && self.media_box == other.media_box
            && self.rotation == other.rotation
    }
}

// --- Document ---

/// An ordered, 0-indexed sequence of pages.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub fn new() -> Self {
        Document { pages: Vec::new() }
    }

    pub fn from_pages(pages: Vec<Page>) -> Self {
        Document { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn push(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

impl FromIterator<Page> for Document {
    fn from_iter<I: IntoIterator<Item = Page>>(iter: I) -> Self {
        Document::from_pages(iter.into_iter().collect())
    }
}
