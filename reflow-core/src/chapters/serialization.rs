use crate::types::*;
use anyhow::Result;
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    pub index: usize,
    pub title: String,
    pub file: String,
}

/// Ordered chapter files plus book metadata, written next to the chapter documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    pub metadata: PackageMetadata,
    pub chapters: Vec<ManifestEntry>,
    pub created_at: DateTime<Utc>,
}

pub fn chapter_file_name(index: usize) -> String {
    format!("chapter_{:03}.xhtml", index)
}

impl ConversionOutput {
    pub fn save_to_json(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn to_manifest(&self) -> PackageManifest {
        let chapters = self
            .chapters
            .iter()
            .enumerate()
            .map(|(i, chapter)| ManifestEntry {
                index: i + 1,
                title: chapter.title.clone(),
                file: chapter_file_name(i + 1),
            })
            .collect();

        PackageManifest {
            metadata: self.metadata.clone(),
            chapters,
            created_at: self.created_at,
        }
    }

    /// Wrap one rendered chapter in a standalone XHTML document.
    pub fn chapter_document(&self, chapter: &RenderedChapter) -> String {
        let title = escape(chapter.title.as_str());
        let lang = escape(self.metadata.language.as_str());
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <!DOCTYPE html>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{lang}\" lang=\"{lang}\">\n\
             <head>\n<meta charset=\"utf-8\"/>\n<title>{title}</title>\n</head>\n\
             <body>\n{}\n</body>\n</html>\n",
            chapter.markup
        )
    }

    /// One XHTML file per chapter plus `manifest.json`.
    pub fn save_xhtml_bundle(&self, dir: &str) -> Result<()> {
        fs::create_dir_all(dir)?;
        let manifest = self.to_manifest();

        for (entry, chapter) in manifest.chapters.iter().zip(&self.chapters) {
            let path = Path::new(dir).join(&entry.file);
            fs::write(path, self.chapter_document(chapter))?;
        }

        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(Path::new(dir).join("manifest.json"), json)?;
        Ok(())
    }

    pub fn save_with_format(&self, path: &str, format: &str) -> Result<()> {
        match format {
            "xhtml" => self.save_xhtml_bundle(path)?,
            _ => self.save_to_json(path)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_output() -> ConversionOutput {
        ConversionOutput {
            metadata: PackageMetadata {
                title: "Field Notes".to_string(),
                author: "Unknown Author".to_string(),
                language: "en".to_string(),
                cover: None,
            },
            chapters: vec![
                RenderedChapter {
                    title: "Tides & Currents".to_string(),
                    markup: "<h1>Tides &amp; Currents</h1>\n<p>Low water.</p>".to_string(),
                },
                RenderedChapter {
                    title: "Birds".to_string(),
                    markup: "<h1>Birds</h1>".to_string(),
                },
            ],
            report: ConversionReport::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn xhtml_bundle_writes_chapters_and_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("book");
        let output = sample_output();

        output.save_with_format(dir.to_str().unwrap(), "xhtml").unwrap();

        let first = fs::read_to_string(dir.join("chapter_001.xhtml")).unwrap();
        assert!(first.contains("<title>Tides &amp; Currents</title>"));
        assert!(first.contains("<p>Low water.</p>"));
        assert!(first.contains("xml:lang=\"en\""));
        assert!(dir.join("chapter_002.xhtml").exists());

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest["metadata"]["title"], "Field Notes");
        assert_eq!(manifest["chapters"][1]["file"], "chapter_002.xhtml");
        assert_eq!(manifest["chapters"][1]["index"], 2);
    }

    #[test]
    fn json_format_holds_whole_output() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.json");

        sample_output().save_with_format(path.to_str().unwrap(), "json").unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["chapters"].as_array().unwrap().len(), 2);
        assert_eq!(value["metadata"]["author"], "Unknown Author");
        assert!(value["report"]["validation"]["issues"].is_array());
    }
}
