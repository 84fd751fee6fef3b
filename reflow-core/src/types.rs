use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::validation::ValidationReport;

// ===== INPUT TYPES =====
// Produced once per page by the extraction collaborators and consumed read-only.
// Coordinates use a top-left origin: y grows downward.

/// One contiguous span of same-style characters at a known position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextGlyphRun {
    pub text: String,
    pub origin_x: f32,
    pub origin_y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    pub font_size: f32,
    #[serde(default)]
    pub font_family: String,
    pub page_number: u32,
}

impl TextGlyphRun {
    /// Height used for line bottoms: declared height, then font size, then 10pt.
    pub fn effective_height(&self) -> f32 {
        if self.height > 0.0 {
            self.height
        } else if self.font_size > 0.0 {
            self.font_size
        } else {
            10.0
        }
    }

    pub fn right(&self) -> f32 {
        self.origin_x + self.width.max(0.0)
    }

    pub fn bottom(&self) -> f32 {
        self.origin_y + self.effective_height()
    }

    pub fn center_x(&self) -> f32 {
        self.origin_x + self.width.max(0.0) / 2.0
    }
}

/// An image asset extracted from the document, referenced by path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedImage {
    pub asset_path: String,
    pub page_number: u32,
    pub origin_x: f32,
    pub origin_y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageContent {
    pub page_number: u32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub runs: Vec<TextGlyphRun>,
}

/// Everything the upstream extractors hand over for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentInput {
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub pages: Vec<PageContent>,
    #[serde(default)]
    pub images: Vec<ExtractedImage>,
}

impl DocumentInput {
    pub fn total_runs(&self) -> usize {
        self.pages.iter().map(|p| p.runs.len()).sum()
    }

    pub fn has_text(&self) -> bool {
        self.pages
            .iter()
            .flat_map(|p| p.runs.iter())
            .any(|r| !r.text.trim().is_empty())
    }

    /// No text and no images anywhere: nothing can be reconstructed.
    pub fn is_blank(&self) -> bool {
        !self.has_text() && self.images.is_empty()
    }
}

// ===== LAYOUT TYPES =====

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x_start: f32,
    pub x_end: f32,
    pub y_start: f32,
    pub y_end: f32,
}

impl BoundingBox {
    pub fn from_run(run: &TextGlyphRun) -> Self {
        Self {
            x_start: run.origin_x,
            x_end: run.right(),
            y_start: run.origin_y,
            y_end: run.bottom(),
        }
    }

    /// Smallest box covering both.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x_start: self.x_start.min(other.x_start),
            x_end: self.x_end.max(other.x_end),
            y_start: self.y_start.min(other.y_start),
            y_end: self.y_end.max(other.y_end),
        }
    }

    pub fn y_mid(&self) -> f32 {
        (self.y_start + self.y_end) / 2.0
    }
}

/// A horizontal band of one page holding one reading flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub x_start: f32,
    pub x_end: f32,
}

impl Column {
    pub fn full_width(page_width: f32) -> Self {
        Self {
            x_start: 0.0,
            x_end: page_width.max(0.0),
        }
    }

    pub fn width(&self) -> f32 {
        self.x_end - self.x_start
    }

    pub fn center(&self) -> f32 {
        (self.x_start + self.x_end) / 2.0
    }

    pub fn contains(&self, x: f32) -> bool {
        x >= self.x_start && x < self.x_end
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Heading,
    Paragraph,
    Caption,
    Header,
    Footer,
}

impl BlockType {
    pub fn is_margin(&self) -> bool {
        matches!(self, BlockType::Header | BlockType::Footer)
    }
}

/// A classified, contiguous unit of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub block_type: BlockType,
    /// 1 or 2 for headings, 0 otherwise
    pub importance: u8,
    pub text: String,
    pub bounding_box: BoundingBox,
    pub page_number: u32,
    pub column_index: usize,
    /// Mean font size of the constituent runs
    pub font_size: f32,
    /// Indices of the source runs in the page's run list
    pub runs: Vec<usize>,
}

impl Block {
    pub fn is_chapter_heading(&self) -> bool {
        self.block_type == BlockType::Heading && self.importance == 1
    }
}

/// Segmenter + Classifier output for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_number: u32,
    pub width: f32,
    pub height: f32,
    pub columns: Vec<Column>,
    pub blocks: Vec<Block>,
}

/// Document-wide font analysis. `average` drives heading detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontStatistics {
    pub average: f32,
    pub median: f32,
    pub min: f32,
    pub max: f32,
    pub run_count: usize,
}

impl Default for FontStatistics {
    fn default() -> Self {
        Self {
            average: 12.0,
            median: 12.0,
            min: 12.0,
            max: 12.0,
            run_count: 0,
        }
    }
}

impl FontStatistics {
    pub fn from_pages(pages: &[PageContent]) -> Self {
        let mut sizes: Vec<f32> = pages
            .iter()
            .flat_map(|p| p.runs.iter())
            .filter(|r| r.font_size > 0.0 && !r.text.trim().is_empty())
            .map(|r| r.font_size)
            .collect();

        if sizes.is_empty() {
            return Self::default();
        }

        sizes.sort_by(|a, b| a.total_cmp(b));
        let run_count = sizes.len();
        let average = sizes.iter().sum::<f32>() / run_count as f32;

        Self {
            average,
            median: sizes[run_count / 2],
            min: sizes[0],
            max: sizes[run_count - 1],
            run_count,
        }
    }
}

// ===== CHAPTER TYPES =====

/// An ordered collection of Blocks bounded by level-1 headings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub blocks: Vec<Block>,
}

// ===== MARKUP TYPES =====

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MarkupContent {
    Text(String),
    /// Text wrapped in one inline element, e.g. `<em>` for captions
    Inline { tag: String, text: String },
    Image { src: String, alt: String },
    /// Self-closed element such as `<hr/>`
    Void,
}

/// A rendered top-level node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkupBlock {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub content: MarkupContent,
}

/// A chapter after rendering: title plus serialized markup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderedChapter {
    pub title: String,
    pub markup: String,
}

// ===== OUTPUT TYPES =====

/// Metadata handed to the packaging collaborator with the chapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageMetadata {
    pub title: String,
    pub author: String,
    pub language: String,
    pub cover: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TranslationStats {
    pub spans: usize,
    pub translated: usize,
    pub failed: usize,
}

impl TranslationStats {
    pub fn absorb(&mut self, other: &TranslationStats) {
        self.spans += other.spans;
        self.translated += other.translated;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionReport {
    pub page_count: usize,
    pub block_count: usize,
    pub chapter_count: usize,
    pub images_inserted: usize,
    pub images_skipped: usize,
    pub translation: Option<TranslationStats>,
    pub validation: ValidationReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub metadata: PackageMetadata,
    pub chapters: Vec<RenderedChapter>,
    pub report: ConversionReport,
    pub created_at: DateTime<Utc>,
}
