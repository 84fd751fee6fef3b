//! Image position correlation: splicing extracted images into rendered
//! chapters next to the text they sat beside on the page.

pub mod correlator;

pub use correlator::{CorrelationOutcome, ImageCorrelator};

use std::path::{Path, PathBuf};

/// Answers whether an image's backing asset can be packaged.
pub trait AssetResolver: Send + Sync {
    fn exists(&self, asset_path: &str) -> bool;
}

/// Checks assets on the local filesystem, relative paths under an optional root.
pub struct FsAssetResolver {
    root: Option<PathBuf>,
}

impl FsAssetResolver {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn resolve(&self, asset_path: &str) -> PathBuf {
        let path = Path::new(asset_path);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl AssetResolver for FsAssetResolver {
    fn exists(&self, asset_path: &str) -> bool {
        !asset_path.trim().is_empty() && self.resolve(asset_path).is_file()
    }
}
