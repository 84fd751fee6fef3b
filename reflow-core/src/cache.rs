use crate::images::AssetResolver;
use crate::translation::Translator;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Version constants for cache invalidation
pub mod versions {
    pub const REFLOW_VERSION: &str = "0.1.0";
    /// Bump when segmentation, assembly or rendering output changes shape
    pub const PROCESSING_VERSION: &str = "1.0.0";
}

/// State of the collaborators a conversion consults beyond its input and config.
///
/// Two runs over the same layout dump only agree when the same translation
/// service answers and the same image assets are present on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollaboratorState {
    /// Identity of the translator, when translation will run
    pub translator: Option<String>,
    /// `(asset_path, exists)` for every referenced image, sorted by path
    pub assets: Vec<(String, bool)>,
}

impl CollaboratorState {
    pub fn capture(
        input: &DocumentInput,
        translator: Option<&dyn Translator>,
        resolver: Option<&dyn AssetResolver>,
    ) -> Self {
        let mut assets: Vec<(String, bool)> = match resolver {
            Some(resolver) => input
                .images
                .iter()
                .map(|img| (img.asset_path.clone(), resolver.exists(&img.asset_path)))
                .collect(),
            None => Vec::new(),
        };
        assets.sort();
        assets.dedup();

        Self {
            translator: translator.map(|t| t.identity()),
            assets,
        }
    }

    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"translator:");
        hasher.update(self.translator.as_deref().unwrap_or("-"));
        for (path, exists) in &self.assets {
            hasher.update(b"\nasset:");
            hasher.update(path);
            hasher.update(if *exists { b"+" } else { b"-" });
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Cache key: extractor output + config + collaborator state → conversion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConversionCacheKey {
    pub input_hash: String,
    pub config_hash: String,
    pub collaborator_hash: String,
    pub reflow_version: String,
    pub processing_version: String,
}

impl ConversionCacheKey {
    pub fn new(input_hash: String, config_hash: String, collaborators: &CollaboratorState) -> Self {
        Self {
            input_hash,
            config_hash,
            collaborator_hash: collaborators.fingerprint(),
            reflow_version: versions::REFLOW_VERSION.to_string(),
            processing_version: versions::PROCESSING_VERSION.to_string(),
        }
    }

    /// File-name-safe digest; components are length-prefixed so they cannot bleed into each other
    pub fn to_cache_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            &self.input_hash,
            &self.config_hash,
            &self.collaborator_hash,
            &self.reflow_version,
            &self.processing_version,
        ] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Cached conversion with timing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionCacheValue {
    pub output: ConversionOutput,
    pub created_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub cache_version: String,
    #[serde(default)]
    pub processing_version: String,
}

impl ConversionCacheValue {
    pub fn new(output: ConversionOutput, processing_time_ms: u64) -> Self {
        Self {
            output,
            created_at: Utc::now(),
            processing_time_ms,
            cache_version: versions::REFLOW_VERSION.to_string(),
            processing_version: versions::PROCESSING_VERSION.to_string(),
        }
    }

    /// Entries written by another release or processing revision are ignored
    pub fn is_current(&self) -> bool {
        self.cache_version == versions::REFLOW_VERSION
            && self.processing_version == versions::PROCESSING_VERSION
    }
}
