use crate::config::{AssemblyConfig, PageOrder};
use crate::types::*;
use tracing::info;

/// Splits the document's ordered blocks into chapters at level-1 headings.
pub struct ChapterAssembler<'a> {
    config: &'a AssemblyConfig,
}

impl<'a> ChapterAssembler<'a> {
    pub fn new(config: &'a AssemblyConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self, layouts: &[PageLayout]) -> Vec<Chapter> {
        let mut pages: Vec<&PageLayout> = layouts.iter().collect();
        pages.sort_by_key(|l| l.page_number);

        let mut chapters: Vec<Chapter> = Vec::new();
        let mut current: Option<Chapter> = None;

        for layout in pages {
            for block in self.ordered_page_blocks(layout) {
                if self.config.single_chapter {
                    current
                        .get_or_insert_with(|| Chapter {
                            title: self.config.single_chapter_title.clone(),
                            blocks: Vec::new(),
                        })
                        .blocks
                        .push(block);
                    continue;
                }

                if block.is_chapter_heading() {
                    if let Some(open) = current.take().filter(|c| !c.blocks.is_empty()) {
                        chapters.push(open);
                    }
                    current = Some(Chapter {
                        title: block.text.trim().to_string(),
                        blocks: vec![block],
                    });
                    continue;
                }

                match current.as_mut() {
                    Some(open) => open.blocks.push(block),
                    None => {
                        current = Some(Chapter {
                            title: self.implicit_title(block.page_number),
                            blocks: vec![block],
                        })
                    }
                }
            }
        }

        if let Some(open) = current.filter(|c| !c.blocks.is_empty()) {
            chapters.push(open);
        }

        info!(
            "📚 Assembled {} chapters from {} blocks",
            chapters.len(),
            chapters.iter().map(|c| c.blocks.len()).sum::<usize>()
        );
        chapters
    }

    /// One page's blocks in reading order, margins dropped unless requested
    fn ordered_page_blocks(&self, layout: &PageLayout) -> Vec<Block> {
        let mut blocks: Vec<Block> = layout
            .blocks
            .iter()
            .filter(|b| self.config.include_header_footer || !b.block_type.is_margin())
            .map(|b| Block {
                page_number: layout.page_number,
                ..b.clone()
            })
            .collect();

        if self.config.page_order == PageOrder::Vertical {
            blocks.sort_by(|a, b| a.bounding_box.y_start.total_cmp(&b.bounding_box.y_start));
        }
        blocks
    }

    fn implicit_title(&self, page_number: u32) -> String {
        self.config
            .implicit_title_template
            .replace("{page}", &page_number.to_string())
    }
}
