use super::engine::ParseRule;
use crate::config::ClassifierConfig;
use crate::types::*;
use anyhow::Result;
use tracing::debug;

/// Promotes blocks set noticeably larger than the document average to headings.
pub struct HeadingDetectionRule<'a> {
    config: &'a ClassifierConfig,
    stats: &'a FontStatistics,
}

impl<'a> HeadingDetectionRule<'a> {
    pub fn new(config: &'a ClassifierConfig, stats: &'a FontStatistics) -> Self {
        Self { config, stats }
    }

    fn importance_for(&self, block: &Block) -> Option<u8> {
        if self.stats.average <= 0.0 || block.text.is_empty() {
            return None;
        }
        let ratio = block.font_size / self.stats.average;
        if ratio > self.config.top_heading_ratio {
            Some(1)
        } else if ratio > self.config.heading_ratio {
            Some(2)
        } else {
            None
        }
    }
}

impl<'a> ParseRule for HeadingDetectionRule<'a> {
    fn apply(&self, blocks: Vec<Block>) -> Result<Vec<Block>> {
        let blocks: Vec<Block> = blocks
            .into_iter()
            .map(|block| match self.importance_for(&block) {
                Some(importance) => Block {
                    block_type: BlockType::Heading,
                    importance,
                    ..block
                },
                None => block,
            })
            .collect();

        debug!(
            "   📝 {} headings detected (average font {:.1}pt)",
            blocks.iter().filter(|b| b.block_type == BlockType::Heading).count(),
            self.stats.average
        );
        Ok(blocks)
    }

    fn name(&self) -> &str {
        "HeadingDetection"
    }
}

/// Reclassifies blocks in the top or bottom band of the page as header/footer.
pub struct MarginBandRule<'a> {
    config: &'a ClassifierConfig,
    page_height: f32,
}

impl<'a> MarginBandRule<'a> {
    pub fn new(config: &'a ClassifierConfig, page_height: f32) -> Self {
        Self {
            config,
            page_height,
        }
    }
}

impl<'a> ParseRule for MarginBandRule<'a> {
    fn apply(&self, blocks: Vec<Block>) -> Result<Vec<Block>> {
        let band = self.config.margin_band_ratio * self.page_height;
        if band <= 0.0 {
            return Ok(blocks);
        }
        let footer_line = self.page_height - band;

        Ok(blocks
            .into_iter()
            .map(|block| {
                let block_type = if block.bounding_box.y_start < band {
                    BlockType::Header
                } else if block.bounding_box.y_end > footer_line {
                    BlockType::Footer
                } else {
                    return block;
                };
                Block {
                    block_type,
                    importance: 0,
                    ..block
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "MarginBands"
    }
}

/// Short paragraphs default to captions.
pub struct CaptionDetectionRule<'a> {
    config: &'a ClassifierConfig,
}

impl<'a> CaptionDetectionRule<'a> {
    pub fn new(config: &'a ClassifierConfig) -> Self {
        Self { config }
    }
}

impl<'a> ParseRule for CaptionDetectionRule<'a> {
    fn apply(&self, blocks: Vec<Block>) -> Result<Vec<Block>> {
        Ok(blocks
            .into_iter()
            .map(|block| {
                let chars = block.text.chars().count();
                if block.block_type == BlockType::Paragraph
                    && chars > 0
                    && chars < self.config.caption_max_chars
                {
                    Block {
                        block_type: BlockType::Caption,
                        ..block
                    }
                } else {
                    block
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "CaptionDetection"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, font_size: f32, y_start: f32, y_end: f32) -> Block {
        Block {
            block_type: BlockType::Paragraph,
            importance: 0,
            text: text.to_string(),
            bounding_box: BoundingBox {
                x_start: 72.0,
                x_end: 500.0,
                y_start,
                y_end,
            },
            page_number: 1,
            column_index: 0,
            font_size,
            runs: vec![0],
        }
    }

    fn stats(average: f32) -> FontStatistics {
        FontStatistics {
            average,
            ..FontStatistics::default()
        }
    }

    #[test]
    fn heading_importance_follows_font_ratio() {
        let config = ClassifierConfig::default();
        let stats = stats(10.0);
        let blocks = vec![
            block("Chapter One", 20.0, 100.0, 120.0),
            block("A Section", 15.0, 200.0, 215.0),
            block("Body", 10.5, 300.0, 310.0),
        ];

        let out = HeadingDetectionRule::new(&config, &stats).apply(blocks).unwrap();

        assert_eq!((out[0].block_type, out[0].importance), (BlockType::Heading, 1));
        assert_eq!((out[1].block_type, out[1].importance), (BlockType::Heading, 2));
        assert_eq!((out[2].block_type, out[2].importance), (BlockType::Paragraph, 0));
    }

    #[test]
    fn margin_bands_mark_header_and_footer() {
        let config = ClassifierConfig::default();
        let blocks = vec![
            block("Running head", 9.0, 30.0, 40.0),
            block("Body", 10.0, 300.0, 310.0),
            block("12", 9.0, 750.0, 760.0),
        ];

        let out = MarginBandRule::new(&config, 792.0).apply(blocks).unwrap();

        assert_eq!(out[0].block_type, BlockType::Header);
        assert_eq!(out[1].block_type, BlockType::Paragraph);
        assert_eq!(out[2].block_type, BlockType::Footer);
    }

    #[test]
    fn margin_band_overrides_heading() {
        let config = ClassifierConfig::default();
        let stats = stats(10.0);
        let blocks = vec![block("Big banner", 24.0, 10.0, 34.0)];

        let headed = HeadingDetectionRule::new(&config, &stats).apply(blocks).unwrap();
        let out = MarginBandRule::new(&config, 792.0).apply(headed).unwrap();

        assert_eq!(out[0].block_type, BlockType::Header);
        assert_eq!(out[0].importance, 0);
    }

    #[test]
    fn short_paragraphs_become_captions_but_headings_stay() {
        let config = ClassifierConfig::default();
        let mut heading = block("Short heading", 20.0, 100.0, 120.0);
        heading.block_type = BlockType::Heading;
        heading.importance = 1;
        let long = "x".repeat(60);
        let blocks = vec![
            heading,
            block("Figure 1. A map", 10.0, 200.0, 210.0),
            block(&long, 10.0, 300.0, 310.0),
            block("", 10.0, 400.0, 410.0),
        ];

        let out = CaptionDetectionRule::new(&config).apply(blocks).unwrap();

        assert_eq!(out[0].block_type, BlockType::Heading);
        assert_eq!(out[1].block_type, BlockType::Caption);
        assert_eq!(out[2].block_type, BlockType::Paragraph);
        assert_eq!(out[3].block_type, BlockType::Paragraph);
    }
}
