use super::source::{filter_small_images, has_extension, LayoutSource};
use crate::types::*;
use anyhow::{Context, Result};
use std::path::Path;

/// Reads a serde JSON dump of [`DocumentInput`].
pub struct JsonLayoutSource {
    min_image_dimension: f32,
}

impl JsonLayoutSource {
    pub fn new(min_image_dimension: f32) -> Self {
        Self {
            min_image_dimension,
        }
    }
}

impl LayoutSource for JsonLayoutSource {
    fn load(&self, bytes: &[u8]) -> Result<DocumentInput> {
        let mut input: DocumentInput =
            serde_json::from_slice(bytes).context("invalid layout JSON")?;
        input.images = filter_small_images(input.images, self.min_image_dimension);
        Ok(input)
    }

    fn name(&self) -> &str {
        "json"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["json"])
    }
}
