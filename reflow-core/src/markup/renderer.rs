use super::{serialize_nodes, ATTR_PAGE, ATTR_Y_END, ATTR_Y_MID, ATTR_Y_START};
use crate::config::RendererConfig;
use crate::types::*;

/// Serializes a chapter's blocks into structure-tagged markup.
pub struct MarkupRenderer<'a> {
    config: &'a RendererConfig,
    include_header_footer: bool,
}

impl<'a> MarkupRenderer<'a> {
    pub fn new(config: &'a RendererConfig, include_header_footer: bool) -> Self {
        Self {
            config,
            include_header_footer,
        }
    }

    pub fn render_chapter(&self, chapter: &Chapter) -> RenderedChapter {
        RenderedChapter {
            title: chapter.title.clone(),
            markup: serialize_nodes(&self.render_blocks(&chapter.blocks)),
        }
    }

    pub fn render_blocks(&self, blocks: &[Block]) -> Vec<MarkupBlock> {
        let mut nodes = Vec::with_capacity(blocks.len());
        for block in blocks {
            if block.text.trim().is_empty() {
                continue;
            }
            if block.block_type.is_margin() && !self.include_header_footer {
                continue;
            }

            nodes.push(self.with_provenance(self.node_for(block), block));
            if block.block_type == BlockType::Heading && self.config.add_separators {
                nodes.push(MarkupBlock::new("hr", MarkupContent::Void));
            }
        }
        nodes
    }

    fn node_for(&self, block: &Block) -> MarkupBlock {
        let text = block.text.trim().to_string();
        match block.block_type {
            BlockType::Heading => {
                let tag = match block.importance {
                    1 => "h1",
                    2 => "h2",
                    _ => "h3",
                };
                MarkupBlock::new(tag, MarkupContent::Text(text))
            }
            BlockType::Paragraph => MarkupBlock::new("p", MarkupContent::Text(text)),
            BlockType::Caption => MarkupBlock::new(
                "p",
                MarkupContent::Inline {
                    tag: "em".to_string(),
                    text,
                },
            )
            .with_attribute("class", "caption"),
            BlockType::Header | BlockType::Footer => {
                let class = if block.block_type == BlockType::Header {
                    "header"
                } else {
                    "footer"
                };
                MarkupBlock::new(
                    "p",
                    MarkupContent::Inline {
                        tag: "small".to_string(),
                        text,
                    },
                )
                .with_attribute("class", class)
            }
        }
    }

    fn with_provenance(&self, node: MarkupBlock, block: &Block) -> MarkupBlock {
        if !self.config.include_provenance {
            return node;
        }
        let bbox = &block.bounding_box;
        node.with_attribute(ATTR_PAGE, block.page_number.to_string())
            .with_attribute(ATTR_Y_START, format!("{:.1}", bbox.y_start))
            .with_attribute(ATTR_Y_END, format!("{:.1}", bbox.y_end))
            .with_attribute(ATTR_Y_MID, format!("{:.1}", bbox.y_mid()))
    }
}
