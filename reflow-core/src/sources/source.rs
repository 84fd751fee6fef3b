// Layout source abstraction
//
// Sources sit on the upstream side of the engine: they turn whatever the
// text and image extractors produced into a DocumentInput. Everything after
// this point works with glyph runs and is format-agnostic.

use crate::types::*;
use anyhow::Result;
use std::path::Path;
use tracing::debug;

pub trait LayoutSource {
    /// Parse extractor output held in memory
    fn load(&self, bytes: &[u8]) -> Result<DocumentInput>;

    /// Read and parse a file, recording it as the source file when the
    /// extractor did not name one
    fn load_file(&self, path: &Path) -> Result<DocumentInput> {
        let bytes = std::fs::read(path)?;
        let mut input = self.load(&bytes)?;
        if input.metadata.source_file.is_none() {
            input.metadata.source_file = Some(path.display().to_string());
        }
        debug!(
            "{} loaded {}: {} pages, {} runs, {} images",
            self.name(),
            path.display(),
            input.pages.len(),
            input.total_runs(),
            input.images.len()
        );
        Ok(input)
    }

    fn name(&self) -> &str;

    fn supports_file_type(&self, path: &Path) -> bool;
}

/// Drop icons and decorations smaller than `min_dimension` on either side.
/// A dimension of 0 means the extractor did not report it; such images are kept.
pub fn filter_small_images(images: Vec<ExtractedImage>, min_dimension: f32) -> Vec<ExtractedImage> {
    let before = images.len();
    let kept: Vec<ExtractedImage> = images
        .into_iter()
        .filter(|img| {
            let too_narrow = img.width > 0.0 && img.width < min_dimension;
            let too_short = img.height > 0.0 && img.height < min_dimension;
            !(too_narrow || too_short)
        })
        .collect();

    if kept.len() < before {
        debug!("dropped {} images below {}px", before - kept.len(), min_dimension);
    }
    kept
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}
