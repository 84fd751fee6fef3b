use crate::config::ReflowConfig;
use crate::types::*;
use anyhow::Result;
use regex::Regex;
use std::cell::RefCell;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::classification::{CaptionDetectionRule, HeadingDetectionRule, MarginBandRule};
use super::columns::ColumnSegmenter;
use super::paragraphs::strategy_for;

// Debug configuration for pipeline tracing
#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub filter_patterns: Vec<String>,
}

impl DebugConfig {
    pub fn new(enabled: bool, filter_patterns: Vec<String>) -> Self {
        Self {
            enabled,
            filter_patterns,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            filter_patterns: Vec::new(),
        }
    }
}

/// Trace blocks whose text matches one of the debug patterns
pub fn debug_pipeline_blocks(rule_name: &str, blocks: &[Block], debug_config: &DebugConfig) {
    if !debug_config.enabled || debug_config.filter_patterns.is_empty() {
        return;
    }

    // Try regex first, fall back to simple string contains
    let matchers: Vec<Result<Regex, &str>> = debug_config
        .filter_patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|_| p.as_str()))
        .collect();

    let matching: Vec<_> = blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| {
            matchers.iter().any(|m| match m {
                Ok(regex) => regex.is_match(&block.text),
                Err(literal) => block.text.contains(literal),
            })
        })
        .collect();

    if matching.is_empty() {
        return;
    }

    info!("🔍 [{}] {} matching blocks:", rule_name, matching.len());
    for (index, block) in matching {
        let preview: String = block.text.chars().take(47).collect();
        info!(
            "  Block {}: \"{}\" ({:?}, importance: {}, page: {}, column: {}, y: {:.1}-{:.1})",
            index,
            preview,
            block.block_type,
            block.importance,
            block.page_number,
            block.column_index,
            block.bounding_box.y_start,
            block.bounding_box.y_end
        );
    }
}

/// Page Segmenter + Paragraph/Block Classifier.
pub struct LayoutEngine {
    debug_config: DebugConfig,
    pub rule_timings: RefCell<Vec<(String, Duration)>>,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self {
            debug_config: DebugConfig::disabled(),
            rule_timings: RefCell::new(Vec::new()),
        }
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.debug_config = debug_config;
    }

    /// Document-wide font analysis feeding heading detection
    pub fn analyze_fonts(&self, pages: &[PageContent]) -> FontStatistics {
        let stats = FontStatistics::from_pages(pages);
        info!(
            "🎯 Font analysis: {} runs, average {:.1}pt (median {:.1}pt, range {:.1}-{:.1}pt)",
            stats.run_count, stats.average, stats.median, stats.min, stats.max
        );
        stats
    }

    /// Lay out every page, in page order
    pub fn layout_document(
        &self,
        pages: &[PageContent],
        stats: &FontStatistics,
        config: &ReflowConfig,
    ) -> Result<Vec<PageLayout>> {
        self.rule_timings.borrow_mut().clear();

        let mut ordered: Vec<&PageContent> = pages.iter().collect();
        ordered.sort_by_key(|p| p.page_number);

        let layouts = ordered
            .into_iter()
            .map(|page| self.layout_page(page, stats, config))
            .collect::<Result<Vec<_>>>()?;

        for (rule, duration) in self.rule_timings.borrow().iter() {
            debug!("   ⏱️  {}: {}µs", rule, duration.as_micros());
        }
        Ok(layouts)
    }

    /// Segment one page into columns and classified blocks
    pub fn layout_page(
        &self,
        page: &PageContent,
        stats: &FontStatistics,
        config: &ReflowConfig,
    ) -> Result<PageLayout> {
        let columns =
            ColumnSegmenter::new(&config.segmenter).detect_columns(&page.runs, page.width);

        let strategy = strategy_for(&config.classifier);
        let blocks = strategy.group_blocks(page, &columns, stats);
        debug_pipeline_blocks(strategy.name(), &blocks, &self.debug_config);

        let blocks = self.apply_rules_with_config(blocks, page, stats, config)?;
        debug!(
            "📄 Page {}: {} runs → {} columns, {} blocks",
            page.page_number,
            page.runs.len(),
            columns.len(),
            blocks.len()
        );

        Ok(PageLayout {
            page_number: page.page_number,
            width: page.width,
            height: page.height,
            columns,
            blocks,
        })
    }

    /// Apply the configured classification rules in order
    pub fn apply_rules_with_config(
        &self,
        blocks: Vec<Block>,
        page: &PageContent,
        stats: &FontStatistics,
        config: &ReflowConfig,
    ) -> Result<Vec<Block>> {
        let mut blocks = blocks;
        for rule_config in &config.pipeline.rules {
            if !rule_config.enabled {
                debug!("   ⏭️  Skipping disabled rule: {}", rule_config.name);
                continue;
            }
            blocks = self.apply_rule_by_name(&rule_config.name, blocks, page, stats, config)?;
        }
        Ok(blocks)
    }

    fn apply_rule_by_name(
        &self,
        rule_name: &str,
        blocks: Vec<Block>,
        page: &PageContent,
        stats: &FontStatistics,
        config: &ReflowConfig,
    ) -> Result<Vec<Block>> {
        let rule_start = Instant::now();
        let result = match rule_name {
            "HeadingDetection" => {
                HeadingDetectionRule::new(&config.classifier, stats).apply(blocks)?
            }
            "MarginBands" => MarginBandRule::new(&config.classifier, page.height).apply(blocks)?,
            "CaptionDetection" => CaptionDetectionRule::new(&config.classifier).apply(blocks)?,
            _ => {
                warn!("⚠️  Unknown rule: {rule_name}. Skipping...");
                blocks
            }
        };
        debug_pipeline_blocks(rule_name, &result, &self.debug_config);

        let elapsed = rule_start.elapsed();
        let mut timings = self.rule_timings.borrow_mut();
        match timings.iter_mut().find(|(name, _)| name == rule_name) {
            Some((_, total)) => *total += elapsed,
            None => timings.push((rule_name.to_string(), elapsed)),
        }
        Ok(result)
    }
}

// Sequential rule pipeline infrastructure
pub trait ParseRule {
    fn apply(&self, blocks: Vec<Block>) -> Result<Vec<Block>>;
    fn name(&self) -> &str;
}
