//! Pipeline boundary tests.
//!
//! Documents are built in code (or written to a temp dir) and pushed through
//! the whole converter. Assertions target the stage boundaries:
//!
//! - Boundary 1 (page layouts): block grouping and per-page reading order
//! - Boundary 2 (chapters): chapter splitting and ordering
//! - Boundary 3 (markup): translation keeps structure, images land once
//! - Boundary 4 (hand-off): errors, cancellation, cache and serialization
//!
//! Heuristic internals (thresholds, rule order) are covered by unit tests
//! beside each module, not here.

use reflow_core::config::{ParagraphStrategyKind, ReflowConfig};
use reflow_core::images::FsAssetResolver;
use reflow_core::storage::{FileStorage, NoOpStorage};
use reflow_core::{
    CancellationToken, DocumentConverter, Phase, ReflowError, TranslationError, Translator,
};
use reflow_core::types::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Fixture helpers
// ============================================================================

const BODY: [&str; 4] = [
    "The survey began along the northern shore",
    "where the tide tables disagreed with the charts",
    "and every sounding had to be taken twice",
    "before the pilots would trust the channel.",
];

fn run(text: &str, x: f32, y: f32, size: f32, page: u32) -> TextGlyphRun {
    TextGlyphRun {
        text: text.to_string(),
        origin_x: x,
        origin_y: y,
        width: 200.0,
        height: size,
        font_size: size,
        font_family: "Serif".to_string(),
        page_number: page,
    }
}

fn page(number: u32, runs: Vec<TextGlyphRun>) -> PageContent {
    PageContent {
        page_number: number,
        width: 612.0,
        height: 792.0,
        runs,
    }
}

/// A heading and one four-line paragraph per page
fn chaptered_document(headings: &[&str]) -> DocumentInput {
    let pages = headings
        .iter()
        .enumerate()
        .map(|(i, heading)| {
            let number = i as u32 + 1;
            let mut runs = vec![run(heading, 72.0, 100.0, 24.0, number)];
            for (line, text) in BODY.iter().enumerate() {
                runs.push(run(text, 72.0, 140.0 + 12.0 * line as f32, 10.0, number));
            }
            page(number, runs)
        })
        .collect();

    DocumentInput {
        metadata: DocumentMetadata::default(),
        pages,
        images: Vec::new(),
    }
}

/// Two columns whose paragraphs interleave vertically
fn two_column_document() -> DocumentInput {
    let runs = vec![
        run("Left column opening paragraph first line", 72.0, 100.0, 10.0, 1),
        run("and the left opening paragraph second line", 72.0, 112.0, 10.0, 1),
        run("Left column closing paragraph first line", 72.0, 200.0, 10.0, 1),
        run("and the left closing paragraph second line", 72.0, 212.0, 10.0, 1),
        run("Right column opening paragraph first line", 320.0, 150.0, 10.0, 1),
        run("and the right opening paragraph second line", 320.0, 162.0, 10.0, 1),
        run("Right column closing paragraph first line", 320.0, 300.0, 10.0, 1),
        run("and the right closing paragraph second line", 320.0, 312.0, 10.0, 1),
    ];

    DocumentInput {
        metadata: DocumentMetadata::default(),
        pages: vec![page(1, runs)],
        images: Vec::new(),
    }
}

fn converter() -> DocumentConverter {
    DocumentConverter::new(&ReflowConfig::default())
}

fn figure_count(chapters: &[RenderedChapter]) -> usize {
    chapters.iter().map(|c| c.markup.matches("<figure").count()).sum()
}

fn write_asset(dir: &Path, name: &str) {
    std::fs::create_dir_all(dir.join("images")).unwrap();
    std::fs::write(dir.join("images").join(name), b"\x89PNG").unwrap();
}

fn image(name: &str, page: u32, y: f32) -> ExtractedImage {
    ExtractedImage {
        asset_path: format!("images/{}", name),
        page_number: page,
        origin_x: 72.0,
        origin_y: y,
        width: 240.0,
        height: 160.0,
    }
}

/// Upper-cases everything except the listed spans, which fail
struct FlakyTranslator {
    failing: Vec<&'static str>,
}

impl Translator for FlakyTranslator {
    fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String, TranslationError> {
        if self.failing.contains(&text) {
            return Err(TranslationError::Timeout);
        }
        Ok(text.to_uppercase())
    }
}

/// Cancels the conversion on its first call
struct CancellingTranslator {
    token: CancellationToken,
}

impl Translator for CancellingTranslator {
    fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String, TranslationError> {
        self.token.cancel();
        Ok(text.to_string())
    }
}

/// Prefixes every span; identity includes the prefix
struct PrefixingTranslator {
    prefix: &'static str,
}

impl Translator for PrefixingTranslator {
    fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String, TranslationError> {
        Ok(format!("{}{}", self.prefix, text))
    }

    fn identity(&self) -> String {
        format!("prefixing:{}", self.prefix)
    }
}

fn translating_config() -> ReflowConfig {
    let mut config = ReflowConfig::default();
    config.translation.enabled = true;
    config.translation.inter_call_delay_ms = 0;
    config
}

// ============================================================================
// Boundary 1: page layouts
// ============================================================================

mod layout_boundary {
    use super::*;

    #[test]
    fn hyphenated_lines_merge_into_one_block() {
        let input = DocumentInput {
            metadata: DocumentMetadata::default(),
            pages: vec![page(
                1,
                vec![
                    run("Hello wor-", 72.0, 100.0, 10.0, 1),
                    run("ld it is", 72.0, 112.0, 10.0, 1),
                ],
            )],
            images: Vec::new(),
        };

        let stages = converter()
            .convert_capture_stages(&input, &ReflowConfig::default(), &CancellationToken::new())
            .unwrap();

        let blocks = &stages.layouts[0].blocks;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Hello world it is");
        assert_eq!(blocks[0].runs, vec![0, 1]);
    }

    #[test]
    fn two_columns_are_detected_and_every_run_used_once() {
        let stages = converter()
            .convert_capture_stages(&two_column_document(), &ReflowConfig::default(), &CancellationToken::new())
            .unwrap();

        let layout = &stages.layouts[0];
        assert_eq!(layout.columns.len(), 2);
        assert_eq!(layout.columns[0].x_start, 0.0);
        assert_eq!(layout.columns[1].x_end, 612.0);

        let mut used: Vec<usize> = layout.blocks.iter().flat_map(|b| b.runs.clone()).collect();
        used.sort_unstable();
        assert_eq!(used, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn page_blocks_in_chapters_are_vertically_ordered_for_both_strategies() {
        for strategy in [ParagraphStrategyKind::ColumnAware, ParagraphStrategyKind::GlobalVertical] {
            let mut config = ReflowConfig::default();
            config.classifier.strategy = strategy;

            let stages = converter()
                .convert_capture_stages(&two_column_document(), &config, &CancellationToken::new())
                .unwrap();

            for chapter in &stages.chapters {
                let starts: Vec<f32> = chapter
                    .blocks
                    .iter()
                    .filter(|b| b.page_number == 1)
                    .map(|b| b.bounding_box.y_start)
                    .collect();
                assert!(
                    starts.windows(2).all(|w| w[0] <= w[1]),
                    "{:?}: {:?}",
                    strategy,
                    starts
                );
            }
            assert_eq!(stages.output.report.validation.reading_order_inversions(), 0);
        }
    }
}

// ============================================================================
// Boundary 2: chapters
// ============================================================================

mod chapter_boundary {
    use super::*;

    #[test]
    fn no_chapter_heading_means_one_chapter_with_every_block() {
        let stages = converter()
            .convert_capture_stages(&two_column_document(), &ReflowConfig::default(), &CancellationToken::new())
            .unwrap();

        assert_eq!(stages.chapters.len(), 1);
        let layout_blocks: usize = stages
            .layouts
            .iter()
            .flat_map(|l| l.blocks.iter())
            .filter(|b| !b.block_type.is_margin())
            .count();
        assert_eq!(stages.chapters[0].blocks.len(), layout_blocks);
        assert_eq!(stages.chapters[0].title, "Page 1");
    }

    #[test]
    fn level_one_headings_split_chapters() {
        let output = converter()
            .convert(&chaptered_document(&["Introduction", "Methods"]), &ReflowConfig::default(), &CancellationToken::new())
            .unwrap();

        let titles: Vec<&str> = output.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Introduction", "Methods"]);
        assert!(output.chapters[0].markup.starts_with("<h1 data-page=\"1\""));
        assert!(output.chapters[0].markup.contains("<hr/>"));
        assert!(output.chapters[1].markup.contains("the tide tables disagreed"));
        assert_eq!(output.metadata.title, "Introduction");
        assert_eq!(output.report.chapter_count, 2);
    }

    #[test]
    fn single_chapter_mode_collapses_everything() {
        let mut config = ReflowConfig::default();
        config.assembly.single_chapter = true;

        let output = converter()
            .convert(&chaptered_document(&["Introduction", "Methods"]), &config, &CancellationToken::new())
            .unwrap();

        assert_eq!(output.chapters.len(), 1);
        assert_eq!(output.chapters[0].title, "Content");
        assert_eq!(output.chapters[0].markup.matches("<h1").count(), 2);
    }
}

// ============================================================================
// Boundary 3: markup (translation + images)
// ============================================================================

mod markup_boundary {
    use super::*;

    #[test]
    fn failed_span_keeps_text_while_the_rest_translates() {
        let config = translating_config();
        let converter = converter().with_translator(Box::new(FlakyTranslator {
            failing: vec!["Introduction"],
        }));

        let output = converter
            .convert(&chaptered_document(&["Introduction", "Methods"]), &config, &CancellationToken::new())
            .unwrap();

        let first = &output.chapters[0];
        assert_eq!(first.title, "Introduction");
        assert!(first.markup.contains(">Introduction</h1>"));
        assert!(first.markup.contains("THE SURVEY BEGAN"));
        assert_eq!(output.chapters[1].title, "METHODS");

        let stats = output.report.translation.unwrap();
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.translated, stats.spans - 2);
        assert_eq!(output.metadata.language, "pt");
    }

    #[test]
    fn translation_preserves_tag_sequence() {
        let plain = converter()
            .convert(&chaptered_document(&["Introduction"]), &ReflowConfig::default(), &CancellationToken::new())
            .unwrap();
        let translated = converter()
            .with_translator(Box::new(FlakyTranslator { failing: vec![] }))
            .convert(&chaptered_document(&["Introduction"]), &translating_config(), &CancellationToken::new())
            .unwrap();

        let tags = |markup: &str| -> Vec<String> {
            markup
                .split('<')
                .skip(1)
                .map(|piece| piece.split('>').next().unwrap_or("").to_string())
                .collect()
        };
        assert_eq!(tags(&plain.chapters[0].markup), tags(&translated.chapters[0].markup));
        assert_ne!(plain.chapters[0].markup, translated.chapters[0].markup);
    }

    #[test]
    fn unsupported_target_language_skips_translation() {
        let mut config = translating_config();
        config.translation.target_language = "xx".to_string();
        let converter = converter().with_translator(Box::new(FlakyTranslator { failing: vec![] }));

        let output = converter
            .convert(&chaptered_document(&["Introduction"]), &config, &CancellationToken::new())
            .unwrap();
        assert!(output.report.translation.is_none());
        assert_eq!(output.chapters[0].title, "Introduction");
    }

    #[test]
    fn images_are_inserted_once_per_existing_asset() {
        let temp = TempDir::new().unwrap();
        write_asset(temp.path(), "map.png");
        write_asset(temp.path(), "chart.png");

        let mut config = ReflowConfig::default();
        config.images.asset_root = Some(temp.path().to_path_buf());
        let mut input = chaptered_document(&["Introduction", "Methods"]);
        input.images = vec![
            image("map.png", 1, 130.0),
            image("map.png", 2, 130.0),
            image("missing.png", 1, 400.0),
            image("chart.png", 2, 600.0),
        ];

        let output = DocumentConverter::new(&config)
            .convert(&input, &config, &CancellationToken::new())
            .unwrap();

        assert_eq!(figure_count(&output.chapters), 2);
        assert_eq!(output.report.images_inserted, 2);
        assert_eq!(output.report.images_skipped, 2);
        assert_eq!(output.metadata.cover.as_deref(), Some("images/map.png"));

        // between the heading (and its separator) and the body paragraph
        let lines: Vec<&str> = output.chapters[0].markup.lines().collect();
        assert!(lines[0].starts_with("<h1"));
        assert_eq!(lines[1], "<hr/>");
        assert!(lines[2].starts_with("<figure class=\"image\" data-page=\"1\""));
        assert!(lines[3].starts_with("<p"));

        // below all text on page 2: end of the last chapter
        assert!(output.chapters[1].markup.ends_with("alt=\"Figure 2\"/></figure>"));
    }

    #[test]
    fn image_only_document_degrades_to_one_chapter() {
        let temp = TempDir::new().unwrap();
        write_asset(temp.path(), "scan.png");

        let mut config = ReflowConfig::default();
        config.images.asset_root = Some(temp.path().to_path_buf());
        let input = DocumentInput {
            metadata: DocumentMetadata::default(),
            pages: vec![page(1, Vec::new())],
            images: vec![image("scan.png", 1, 50.0)],
        };

        let output = DocumentConverter::new(&config)
            .convert(&input, &config, &CancellationToken::new())
            .unwrap();

        assert_eq!(output.chapters.len(), 1);
        assert_eq!(output.chapters[0].title, "Page 1");
        assert_eq!(figure_count(&output.chapters), 1);
    }
}

// ============================================================================
// Boundary 4: hand-off (errors, cancellation, cache, serialization)
// ============================================================================

mod handoff_boundary {
    use super::*;

    #[test]
    fn catastrophic_input_is_reported_separately() {
        let result = converter().convert(&DocumentInput::default(), &ReflowConfig::default(), &CancellationToken::new());
        assert!(matches!(result, Err(ReflowError::EmptyDocument)));
    }

    #[test]
    fn cancellation_mid_translation_stops_before_correlation() {
        let token = CancellationToken::new();
        let converter = converter().with_translator(Box::new(CancellingTranslator { token: token.clone() }));

        let result = converter.convert(&chaptered_document(&["Introduction"]), &translating_config(), &token);
        assert!(matches!(result, Err(ReflowError::Cancelled(Phase::Correlation))));
    }

    #[test]
    fn cancellation_mid_translation_stops_hand_off_without_images() {
        let token = CancellationToken::new();
        let converter = converter().with_translator(Box::new(CancellingTranslator { token: token.clone() }));
        let mut config = translating_config();
        config.images.enabled = false;

        let result = converter.convert(&chaptered_document(&["Introduction"]), &config, &token);
        assert!(token.is_cancelled());
        assert!(matches!(result, Err(ReflowError::Cancelled(Phase::Packaging))));
    }

    #[test]
    fn cache_distinguishes_translators() {
        let temp = TempDir::new().unwrap();
        let input_path = temp.path().join("layout.json");
        std::fs::write(&input_path, serde_json::to_string(&chaptered_document(&["Introduction"])).unwrap()).unwrap();
        let cache_dir = temp.path().join("cache");
        let path = input_path.to_str().unwrap();
        let config = translating_config();

        let convert_with = |prefix: &'static str| {
            DocumentConverter::new_with_dependencies(
                Box::new(FileStorage::new(cache_dir.to_str().unwrap()).unwrap()),
                Some(Box::new(PrefixingTranslator { prefix })),
                Box::new(FsAssetResolver::new(None)),
            )
            .convert_file(path, &config, false, false, &CancellationToken::new())
            .unwrap()
        };

        assert_eq!(convert_with("A:").chapters[0].title, "A:Introduction");
        assert_eq!(convert_with("B:").chapters[0].title, "B:Introduction");
        assert_eq!(convert_with("A:").chapters[0].title, "A:Introduction");
    }

    #[test]
    fn cache_notices_assets_appearing() {
        let temp = TempDir::new().unwrap();
        let mut input = chaptered_document(&["Introduction"]);
        input.images = vec![image("late.png", 1, 130.0)];
        let input_path = temp.path().join("layout.json");
        std::fs::write(&input_path, serde_json::to_string(&input).unwrap()).unwrap();
        let cache_dir = temp.path().join("cache");

        let mut config = ReflowConfig::default();
        config.images.asset_root = Some(temp.path().to_path_buf());
        let converter = DocumentConverter::new_cli_with_cache(&config, cache_dir.to_str().unwrap()).unwrap();
        let path = input_path.to_str().unwrap();

        let before = converter.convert_file(path, &config, false, false, &CancellationToken::new()).unwrap();
        assert_eq!(figure_count(&before.chapters), 0);

        write_asset(temp.path(), "late.png");
        let after = converter.convert_file(path, &config, false, false, &CancellationToken::new()).unwrap();
        assert_eq!(figure_count(&after.chapters), 1);
    }

    #[test]
    fn file_conversion_is_cached() {
        let temp = TempDir::new().unwrap();
        let input_path = temp.path().join("layout.json");
        std::fs::write(&input_path, serde_json::to_string(&chaptered_document(&["Introduction"])).unwrap()).unwrap();
        let cache_dir = temp.path().join("cache");

        let config = ReflowConfig::default();
        let converter = DocumentConverter::new_with_dependencies(
            Box::new(FileStorage::new(cache_dir.to_str().unwrap()).unwrap()),
            None,
            Box::new(FsAssetResolver::new(None)),
        );

        let path = input_path.to_str().unwrap();
        let first = converter.convert_file(path, &config, false, false, &CancellationToken::new()).unwrap();
        let second = converter.convert_file(path, &config, true, false, &CancellationToken::new()).unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(first.chapters, second.chapters);
    }

    #[test]
    fn xhtml_layout_converts_end_to_end() {
        let temp = TempDir::new().unwrap();
        let input_path = temp.path().join("report.xhtml");
        let mut spans = String::from(r#"<span class="f0" data-bbox="72,100,200,24">Findings</span>"#);
        for (line, text) in BODY.iter().enumerate() {
            spans.push_str(&format!(
                r#"<span class="f1" data-bbox="72,{},300,10">{}</span>"#,
                140 + 12 * line,
                text
            ));
        }
        let xhtml = format!(
            r#"<html><head><meta name="dc:creator" content="Harbour Office"/>
<style>.f0 {{ font-family: Serif; font-size: 24px; }} .f1 {{ font-family: Serif; font-size: 10px; }}</style></head>
<body><div class="page" data-page="1" data-width="612" data-height="792">{}</div></body></html>"#,
            spans
        );
        std::fs::write(&input_path, xhtml).unwrap();

        let converter = DocumentConverter::new_with_dependencies(
            Box::new(NoOpStorage::new()),
            None,
            Box::new(FsAssetResolver::new(None)),
        );
        let output = converter
            .convert_file(input_path.to_str().unwrap(), &ReflowConfig::default(), false, true, &CancellationToken::new())
            .unwrap();

        assert_eq!(output.chapters.len(), 1);
        assert_eq!(output.chapters[0].title, "Findings");
        assert_eq!(output.metadata.author, "Harbour Office");
    }

    #[test]
    fn json_hand_off_carries_metadata_and_report() {
        let temp = TempDir::new().unwrap();
        let out_path = temp.path().join("book.json");

        let output = converter()
            .convert(&chaptered_document(&["Introduction", "Methods"]), &ReflowConfig::default(), &CancellationToken::new())
            .unwrap();
        output.save_with_format(out_path.to_str().unwrap(), "json").unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["author"], "Unknown Author");
        assert_eq!(value["metadata"]["language"], "en");
        assert_eq!(value["chapters"].as_array().unwrap().len(), 2);
        assert_eq!(value["report"]["chapter_count"], 2);
        assert!(value["metadata"]["cover"].is_null());
    }
}
