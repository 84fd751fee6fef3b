//! Layout Sources
//!
//! Adapters for the upstream extraction collaborators. Each source turns an
//! extractor's output into a [`DocumentInput`](crate::types::DocumentInput).
//!
//! ```text
//! extractor output (.json dump | positioned-span .xhtml)
//!     ↓
//! [LayoutSource]
//!     ↓
//! DocumentInput
//!     ↓
//! [DocumentConverter]
//! ```

pub mod json;
pub mod source;
pub mod xhtml;

pub use json::JsonLayoutSource;
pub use source::LayoutSource;
pub use xhtml::XhtmlLayoutSource;

use std::path::Path;

/// Pick the source that understands `path`, by file extension.
pub fn source_for_path(path: &Path, min_image_dimension: f32) -> Option<Box<dyn LayoutSource>> {
    let candidates: Vec<Box<dyn LayoutSource>> = vec![
        Box::new(JsonLayoutSource::new(min_image_dimension)),
        Box::new(XhtmlLayoutSource::new(min_image_dimension)),
    ];
    candidates.into_iter().find(|s| s.supports_file_type(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_source_by_extension() {
        assert_eq!(source_for_path(Path::new("a.json"), 32.0).unwrap().name(), "json");
        assert_eq!(source_for_path(Path::new("a.xhtml"), 32.0).unwrap().name(), "xhtml");
        assert!(source_for_path(Path::new("a.pdf"), 32.0).is_none());
    }
}
