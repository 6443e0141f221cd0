//! Page transforms.

use crate::model::Page;

/// Rotate a page clockwise by `angle` degrees on top of its current rotation.
///
/// Only the `/Rotate` attribute changes; the content stream is untouched.
/// Callers pass an owned copy, never a page still held by a source document.
pub fn rotate(mut page: Page, angle: i32) -> Page {
    let rotation = page.rotation();
    page.set_rotation(rotation + angle.rem_euclid(360));
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rectangle;

    #[test]
    fn test_rotation_accumulates() {
        let page = Page::blank(Rectangle::letter()).with_rotation(90);
        assert_eq!(rotate(page, 90).rotation(), 180);
    }

    #[test]
    fn test_negative_and_large_angles() {
        let page = Page::blank(Rectangle::letter());
        assert_eq!(rotate(page.clone(), -90).rotation(), 270);
        assert_eq!(rotate(page.clone(), 720).rotation(), 0);
        assert_eq!(rotate(page, i32::MIN + 16).rotation(), (i32::MIN + 16).rem_euclid(360));
    }

    #[test]
    fn test_four_quarter_turns_are_identity() {
        let original = Page::new(Rectangle::letter(), b"BT ET".to_vec(), Default::default())
            .with_rotation(270);
        let mut page = original.clone();
        for _ in 0..4 {
            page = rotate(page, 90);
        }
        assert!(page.same_content(&original));
    }

    #[test]
    fn test_content_untouched() {
        let page = Page::new(Rectangle::letter(), b"0 0 m 10 10 l S".to_vec(), Default::default());
        let rotated = rotate(page.clone(), 180);
        assert_eq!(rotated.content, page.content);
        assert_eq!(rotated.media_box, page.media_box);
    }
}
