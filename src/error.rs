//! Error types for document editing.
//!
//! Every operation either yields a complete result or fails with one of these
//! kinds; there is no partial output.

use thiserror::Error;

/// Error type for all editing operations.
#[derive(Debug, Error)]
pub enum EditError {
    /// Malformed or unreadable input document, or a failure while writing one.
    #[error("codec error: {0}")]
    Codec(String),

    /// Invalid text-overlay geometry.
    #[error("render error: {0}")]
    Render(String),

    /// Operation parameters rejected explicitly rather than clamped.
    #[error("invalid parameter: {0}")]
    Validation(String),

    /// Unusable editor configuration.
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditError {
    pub(crate) fn codec(context: &str, err: impl std::fmt::Display) -> Self {
        EditError::Codec(format!("{}: {}", context, err))
    }

    /// Prefix the message with the file it concerns, keeping the error kind.
    pub fn in_file(self, path: &std::path::Path) -> Self {
        let at = |msg: String| format!("{}: {}", path.display(), msg);
        match self {
            EditError::Codec(msg) => EditError::Codec(at(msg)),
            EditError::Render(msg) => EditError::Render(at(msg)),
            EditError::Validation(msg) => EditError::Validation(at(msg)),
            EditError::Config(msg) => EditError::Config(at(msg)),
            EditError::Io(err) => EditError::Io(std::io::Error::new(err.kind(), at(err.to_string()))),
        }
    }
}

pub type Result<T> = std::result::Result<T, EditError>;
