use crate::cache::{ConversionCacheKey, ConversionCacheValue};
use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Storage abstraction for caching conversion results
pub trait ConversionStorage {
    fn get_conversion(&self, cache_key: &ConversionCacheKey) -> Result<Option<ConversionCacheValue>>;
    fn store_conversion(&self, cache_key: &ConversionCacheKey, cache_value: &ConversionCacheValue) -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: String,
}

impl FileStorage {
    pub fn new(cache_dir: &str) -> Result<Self> {
        fs::create_dir_all(format!("{cache_dir}/conversions"))?;

        Ok(Self {
            cache_dir: cache_dir.to_string(),
        })
    }

    fn conversion_path(&self, cache_key: &ConversionCacheKey) -> String {
        format!("{}/conversions/{}.json", self.cache_dir, cache_key.to_cache_hash())
    }
}

impl ConversionStorage for FileStorage {
    fn get_conversion(&self, cache_key: &ConversionCacheKey) -> Result<Option<ConversionCacheValue>> {
        let path = self.conversion_path(cache_key);
        if !Path::new(&path).exists() {
            return Ok(None);
        }

        let json_str = fs::read_to_string(path)?;
        let cache_value: ConversionCacheValue = serde_json::from_str(&json_str)
            .map_err(|e| anyhow!("Failed to deserialize cached conversion: {}", e))?;
        Ok(Some(cache_value).filter(ConversionCacheValue::is_current))
    }

    fn store_conversion(&self, cache_key: &ConversionCacheKey, cache_value: &ConversionCacheValue) -> Result<()> {
        let path = self.conversion_path(cache_key);
        let json_str = serde_json::to_string_pretty(cache_value)
            .map_err(|e| anyhow!("Failed to serialize conversion for cache: {}", e))?;
        fs::write(path, json_str)?;
        Ok(())
    }
}

/// Fast hash of extractor output: size plus the first and last 1KB
pub fn calculate_input_hash(bytes: &[u8]) -> String {
    let chunk_size = 1024;
    let mut hasher = Sha256::new();

    hasher.update(bytes.len().to_le_bytes());

    let start_end = std::cmp::min(chunk_size, bytes.len());
    hasher.update(&bytes[0..start_end]);

    if bytes.len() > chunk_size {
        let end_start = bytes.len() - chunk_size;
        hasher.update(&bytes[end_start..]);
    }

    format!("{:x}", hasher.finalize())
}

/// Hash of the serialized configuration
pub fn calculate_config_hash<T: serde::Serialize>(config: &T) -> Result<String> {
    let config_json = serde_json::to_string(config)
        .map_err(|e| anyhow!("Failed to serialize config for hashing: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// No-op storage implementation that disables all caching
#[derive(Default)]
pub struct NoOpStorage;

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl ConversionStorage for NoOpStorage {
    fn get_conversion(&self, _cache_key: &ConversionCacheKey) -> Result<Option<ConversionCacheValue>> {
        Ok(None)
    }

    fn store_conversion(&self, _cache_key: &ConversionCacheKey, _cache_value: &ConversionCacheValue) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CollaboratorState;
    use crate::config::ReflowConfig;
    use crate::types::*;
    use tempfile::TempDir;

    fn output() -> ConversionOutput {
        ConversionOutput {
            metadata: PackageMetadata {
                title: "Doc".to_string(),
                author: "Unknown Author".to_string(),
                language: "en".to_string(),
                cover: None,
            },
            chapters: vec![RenderedChapter {
                title: "Page 1".to_string(),
                markup: "<p>x</p>".to_string(),
            }],
            report: ConversionReport::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn input_hash_consistency_and_uniqueness() {
        assert_eq!(calculate_input_hash(b"layout one"), calculate_input_hash(b"layout one"));
        assert_ne!(calculate_input_hash(b"layout one"), calculate_input_hash(b"layout two"));

        let big: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut tail_changed = big.clone();
        *tail_changed.last_mut().unwrap() ^= 1;
        assert_ne!(calculate_input_hash(&big), calculate_input_hash(&tail_changed));
    }

    #[test]
    fn config_hash_tracks_settings() {
        let base = ReflowConfig::default();
        let mut changed = ReflowConfig::default();
        changed.assembly.single_chapter = true;

        assert_eq!(calculate_config_hash(&base).unwrap(), calculate_config_hash(&base).unwrap());
        assert_ne!(calculate_config_hash(&base).unwrap(), calculate_config_hash(&changed).unwrap());
    }

    #[test]
    fn file_storage_roundtrip() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path().to_str().unwrap()).unwrap();
        let key = ConversionCacheKey::new("input".to_string(), "config".to_string(), &CollaboratorState::default());

        assert!(storage.get_conversion(&key).unwrap().is_none());

        storage.store_conversion(&key, &ConversionCacheValue::new(output(), 12)).unwrap();
        let cached = storage.get_conversion(&key).unwrap().unwrap();
        assert_eq!(cached.output.chapters[0].markup, "<p>x</p>");
        assert_eq!(cached.processing_time_ms, 12);
    }

    #[test]
    fn noop_storage_always_misses() {
        let storage = NoOpStorage::new();
        let key = ConversionCacheKey::new("a".to_string(), "b".to_string(), &CollaboratorState::default());
        storage.store_conversion(&key, &ConversionCacheValue::new(output(), 1)).unwrap();
        assert!(storage.get_conversion(&key).unwrap().is_none());
    }
}
