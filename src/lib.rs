//! # pdfedit
//!
//! Page-level editing of existing PDF documents. This library provides:
//!
//! - **Merge**: Concatenate documents in order
//! - **Split**: Extract each page of a range into its own document
//! - **Rotate**: Turn every page by a multiple of 90 degrees
//! - **Remove**: Drop pages by index
//! - **Text overlay**: Draw strings at given positions on chosen pages
//! - **Watermark**: Stamp one page onto every page of a document
//! - **Batch**: Run an edit over many files in parallel
//!
//! Every operation takes encoded bytes and returns new encoded bytes; inputs
//! are never modified.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfedit::PdfEditor;
//!
//! let editor: PdfEditor = PdfEditor::default();
//! let a = std::fs::read("a.pdf").unwrap();
//! let b = std::fs::read("b.pdf").unwrap();
//! let merged = editor.merge(&[&a, &b]).expect("Failed to merge");
//! std::fs::write("merged.pdf", merged).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`pdf_ops`]: The six editing operations on [`PdfEditor`]
//! - [`model`]: In-memory pages and documents
//! - [`codec`]: Decoding and encoding PDF bytes
//! - [`content`]: Text overlay content generation
//! - [`composite`]: Stacking one page over another
//! - [`select`]: Page selection rules
//! - [`transform`]: Page rotation
//! - [`params`]: Page lists and text edit parameters
//! - [`parallel`]: Batch processing with Rayon
//! - [`config`]: Editor configuration
//!
//! ## Examples
//!
//! ### Adding text to a page
//!
//! ```rust,no_run
//! use pdfedit::PdfEditor;
//!
//! let editor: PdfEditor = PdfEditor::default();
//! let input = std::fs::read("input.pdf").unwrap();
//! let output = editor
//!     .add_text(&input, 0, "APPROVED", 100.0, 750.0)
//!     .expect("Failed to add text");
//! std::fs::write("output.pdf", output).unwrap();
//! ```
//!
//! ### Watermarking with a custom configuration
//!
//! ```rust,no_run
//! use pdfedit::{EditorConfig, PdfEditor};
//!
//! let config = EditorConfig::from_json_file("pdfedit.json").expect("Bad config");
//! let editor = PdfEditor::from_config(&config);
//! let input = std::fs::read("input.pdf").unwrap();
//! let stamp = std::fs::read("stamp.pdf").unwrap();
//! let output = editor.watermark(&input, &stamp).expect("Failed to watermark");
//! std::fs::write("output.pdf", output).unwrap();
//! ```

pub mod codec;
pub mod composite;
pub mod config;
pub mod content;
pub mod error;
pub mod model;
pub mod params;
pub mod parallel;
pub mod pdf_ops;
pub mod select;
pub mod transform;

#[cfg(test)]
mod test_support;

pub use config::EditorConfig;
pub use error::{EditError, Result};
pub use model::{Document, Page, Rectangle};
pub use params::TextEdit;
pub use pdf_ops::PdfEditor;
