use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_column_tolerance_ratio() -> f32 {
    0.05
}

fn default_min_column_runs() -> usize {
    3
}

fn default_min_column_share() -> f32 {
    0.10
}

fn default_paragraph_gap_ratio() -> f32 {
    0.7
}

fn default_font_size_change() -> f32 {
    1.0
}

fn default_short_line_ratio() -> f32 {
    0.7
}

fn default_indent_tolerance() -> f32 {
    5.0
}

fn default_strong_indent() -> f32 {
    10.0
}

fn default_left_margin_percentile() -> f32 {
    0.2
}

fn default_line_merge_ratio() -> f32 {
    0.5
}

fn default_word_gap_ratio() -> f32 {
    0.2
}

fn default_heading_ratio() -> f32 {
    1.3
}

fn default_top_heading_ratio() -> f32 {
    1.8
}

fn default_margin_band_ratio() -> f32 {
    0.10
}

fn default_caption_max_chars() -> usize {
    50
}

fn default_implicit_title_template() -> String {
    "Page {page}".to_string()
}

fn default_single_chapter_title() -> String {
    "Content".to_string()
}

fn default_source_language() -> String {
    "auto".to_string()
}

fn default_target_language() -> String {
    "pt".to_string()
}

fn default_min_text_chars() -> usize {
    3
}

fn default_inter_call_delay_ms() -> u64 {
    100
}

fn default_max_chunk_chars() -> usize {
    4500
}

fn default_min_image_dimension() -> f32 {
    32.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflowConfig {
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub assembly: AssemblyConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub images: ImageConfig,
    /// Classification rules to run on each page, in order
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Clustering tolerance for run X-origins, as a fraction of page width
    #[serde(default = "default_column_tolerance_ratio")]
    pub column_tolerance_ratio: f32,
    /// Clusters need at least this many runs...
    #[serde(default = "default_min_column_runs")]
    pub min_column_runs: usize,
    /// ...and at least this share of the page's runs
    #[serde(default = "default_min_column_share")]
    pub min_column_share: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            column_tolerance_ratio: default_column_tolerance_ratio(),
            min_column_runs: default_min_column_runs(),
            min_column_share: default_min_column_share(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphStrategyKind {
    /// Assign runs to columns, then read each column top to bottom
    #[default]
    ColumnAware,
    /// One vertical flow per page, ignoring columns
    GlobalVertical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub strategy: ParagraphStrategyKind,
    /// Vertical gap (× average font size) that starts a new block
    #[serde(default = "default_paragraph_gap_ratio")]
    pub paragraph_gap_ratio: f32,
    /// Font size difference in points that starts a new block
    #[serde(default = "default_font_size_change")]
    pub font_size_change: f32,
    /// A line ending before this fraction of the column width counts as short
    #[serde(default = "default_short_line_ratio")]
    pub short_line_ratio: f32,
    /// Points past the common left margin that count as an indent after a short line
    #[serde(default = "default_indent_tolerance")]
    pub indent_tolerance: f32,
    /// Points past the common left margin that always start a new block
    #[serde(default = "default_strong_indent")]
    pub strong_indent: f32,
    /// Percentile of run X-origins taken as the common left margin
    #[serde(default = "default_left_margin_percentile")]
    pub left_margin_percentile: f32,
    /// Runs whose tops differ by at most this × font size share a line
    #[serde(default = "default_line_merge_ratio")]
    pub line_merge_ratio: f32,
    /// Horizontal gap (× font size) between runs that inserts a space
    #[serde(default = "default_word_gap_ratio")]
    pub word_gap_ratio: f32,
    /// Block/average font size ratio above which a block is a heading
    #[serde(default = "default_heading_ratio")]
    pub heading_ratio: f32,
    /// Ratio above which a heading has importance 1 (chapter heading)
    #[serde(default = "default_top_heading_ratio")]
    pub top_heading_ratio: f32,
    /// Top and bottom fraction of page height treated as header/footer bands
    #[serde(default = "default_margin_band_ratio")]
    pub margin_band_ratio: f32,
    /// Paragraphs shorter than this many characters become captions
    #[serde(default = "default_caption_max_chars")]
    pub caption_max_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: ParagraphStrategyKind::default(),
            paragraph_gap_ratio: default_paragraph_gap_ratio(),
            font_size_change: default_font_size_change(),
            short_line_ratio: default_short_line_ratio(),
            indent_tolerance: default_indent_tolerance(),
            strong_indent: default_strong_indent(),
            left_margin_percentile: default_left_margin_percentile(),
            line_merge_ratio: default_line_merge_ratio(),
            word_gap_ratio: default_word_gap_ratio(),
            heading_ratio: default_heading_ratio(),
            top_heading_ratio: default_top_heading_ratio(),
            margin_band_ratio: default_margin_band_ratio(),
            caption_max_chars: default_caption_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageOrder {
    /// Re-sort each page's blocks by vertical start
    #[default]
    Vertical,
    /// Keep the classifier's column-then-vertical order
    ColumnThenVertical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    #[serde(default)]
    pub include_header_footer: bool,
    #[serde(default)]
    pub page_order: PageOrder,
    /// Title for content preceding the first chapter heading; `{page}` is replaced
    #[serde(default = "default_implicit_title_template")]
    pub implicit_title_template: String,
    /// Put every block in one chapter (fast mode)
    #[serde(default)]
    pub single_chapter: bool,
    #[serde(default = "default_single_chapter_title")]
    pub single_chapter_title: String,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            include_header_footer: false,
            page_order: PageOrder::default(),
            implicit_title_template: default_implicit_title_template(),
            single_chapter: false,
            single_chapter_title: default_single_chapter_title(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Emit `<hr/>` after every heading
    #[serde(default = "default_true")]
    pub add_separators: bool,
    /// Emit data-page / data-y-* attributes
    #[serde(default = "default_true")]
    pub include_provenance: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            add_separators: true,
            include_provenance: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_source_language")]
    pub source_language: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    /// Spans with fewer characters are left untouched
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    #[serde(default = "default_inter_call_delay_ms")]
    pub inter_call_delay_ms: u64,
    /// Longer spans are split before submission
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default)]
    pub parallel_chapters: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source_language: default_source_language(),
            target_language: default_target_language(),
            min_text_chars: default_min_text_chars(),
            inter_call_delay_ms: default_inter_call_delay_ms(),
            max_chunk_chars: default_max_chunk_chars(),
            parallel_chapters: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory relative asset paths are resolved against
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
    /// Images smaller than this in either dimension are dropped by the sources
    #[serde(default = "default_min_image_dimension")]
    pub min_image_dimension: f32,
    #[serde(default = "default_true")]
    pub cover_from_first_image: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            asset_root: None,
            min_image_dimension: default_min_image_dimension(),
            cover_from_first_image: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// List of rules to run in order
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Name of the rule
    pub name: String,
    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl RuleConfig {
    fn enabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                RuleConfig::enabled("HeadingDetection"),
                RuleConfig::enabled("MarginBands"),
                RuleConfig::enabled("CaptionDetection"),
            ],
        }
    }
}

impl ReflowConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReflowConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("⚠️  Failed to load config from {}: {}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
