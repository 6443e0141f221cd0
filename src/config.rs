//! Editor configuration.
//!
//! Controls the generated text overlays and the encoder output. Loaded from a
//! JSON file; any missing field falls back to its default.

use crate::error::{EditError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Standard-14 base font used for text overlays.
    pub font: String,
    /// Font size in points for text overlays.
    pub font_size: f32,
    /// Header version written by the encoder.
    pub pdf_version: String,
    /// Flate-compress streams on encode.
    pub compress: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            font: "Helvetica".to_string(),
            font_size: 12.0,
            pdf_version: "1.5".to_string(),
            compress: true,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EditorConfig =
            serde_json::from_str(json).map_err(|e| EditError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.font.trim().is_empty() {
            return Err(EditError::Config("font must not be empty".into()));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(EditError::Config(format!(
                "font_size must be a positive number, got {}",
                self.font_size
            )));
        }
        if self.pdf_version.trim().is_empty() {
            return Err(EditError::Config("pdf_version must not be empty".into()));
        }
        Ok(())
    }
}
