use super::AssetResolver;
use crate::config::ImageConfig;
use crate::markup::{ATTR_PAGE, ATTR_Y_MID};
use crate::types::{ExtractedImage, MarkupBlock, RenderedChapter};
use anyhow::{bail, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// A top-level node of rendered chapter markup.
#[derive(Debug, Clone, PartialEq)]
struct MarkupNode {
    fragment: String,
    page: Option<u32>,
    y_mid: Option<f32>,
}

/// Where an image lands: before local node `position` of `chapter`
/// (`position == len` appends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    chapter: usize,
    position: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CorrelationOutcome {
    pub chapters: Vec<RenderedChapter>,
    pub inserted: usize,
    pub skipped_missing: usize,
    pub skipped_duplicate: usize,
    /// Asset path of the first inserted image, when cover selection is on
    pub cover: Option<String>,
}

impl CorrelationOutcome {
    pub fn skipped(&self) -> usize {
        self.skipped_missing + self.skipped_duplicate
    }
}

pub struct ImageCorrelator<'a> {
    config: &'a ImageConfig,
    resolver: &'a dyn AssetResolver,
}

impl<'a> ImageCorrelator<'a> {
    pub fn new(config: &'a ImageConfig, resolver: &'a dyn AssetResolver) -> Self {
        Self { config, resolver }
    }

    /// Splice every image with an existing asset into the chapters exactly once.
    pub fn correlate(&self, chapters: &[RenderedChapter], images: &[ExtractedImage]) -> CorrelationOutcome {
        let mut outcome = CorrelationOutcome::default();
        let candidates = self.usable_images(images, &mut outcome);

        if candidates.is_empty() || chapters.is_empty() {
            if !candidates.is_empty() {
                warn!("⚠️  {} images dropped: no chapter to place them in", candidates.len());
                outcome.skipped_missing += candidates.len();
            }
            outcome.chapters = chapters.to_vec();
            return outcome;
        }

        let parsed: Vec<Vec<MarkupNode>> = chapters.iter().map(|c| scan_nodes(&c.markup)).collect();

        let mut placements: Vec<(Slot, usize, MarkupBlock)> = Vec::with_capacity(candidates.len());
        for (seq, image) in candidates.iter().enumerate() {
            let slot = place(&parsed, image);
            let figure = MarkupBlock::figure(
                &image.asset_path,
                &format!("Figure {}", seq + 1),
                image.page_number,
                image.origin_y,
            );
            debug!(
                "image {} (page {}, y {:.1}) → chapter {} position {}",
                image.asset_path, image.page_number, image.origin_y, slot.chapter, slot.position
            );
            placements.push((slot, seq, figure));
        }
        placements.sort_by_key(|(slot, seq, _)| (*slot, *seq));

        outcome.chapters = chapters
            .iter()
            .zip(&parsed)
            .enumerate()
            .map(|(index, (chapter, nodes))| {
                let figures: Vec<&(Slot, usize, MarkupBlock)> =
                    placements.iter().filter(|(slot, _, _)| slot.chapter == index).collect();
                if figures.is_empty() {
                    return chapter.clone();
                }
                RenderedChapter {
                    title: chapter.title.clone(),
                    markup: splice(nodes, &figures),
                }
            })
            .collect();

        outcome.inserted = candidates.len();
        if self.config.cover_from_first_image {
            outcome.cover = candidates.first().map(|img| img.asset_path.clone());
        }

        info!(
            "🖼️  Inserted {} images ({} missing, {} duplicates skipped)",
            outcome.inserted, outcome.skipped_missing, outcome.skipped_duplicate
        );
        outcome
    }

    /// Deduplicated images with existing assets, in (page, y) order.
    fn usable_images(&self, images: &[ExtractedImage], outcome: &mut CorrelationOutcome) -> Vec<ExtractedImage> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut usable = Vec::new();

        for image in images {
            if !seen.insert(image.asset_path.as_str()) {
                outcome.skipped_duplicate += 1;
                continue;
            }
            if !self.resolver.exists(&image.asset_path) {
                warn!("⚠️  Skipping image with missing asset: {}", image.asset_path);
                outcome.skipped_missing += 1;
                continue;
            }
            usable.push(image.clone());
        }

        usable.sort_by(|a, b| {
            a.page_number
                .cmp(&b.page_number)
                .then(a.origin_y.total_cmp(&b.origin_y))
        });
        usable
    }
}

/// Pick the insertion slot for one image across all chapters.
fn place(chapters: &[Vec<MarkupNode>], image: &ExtractedImage) -> Slot {
    let page = image.page_number;
    let flat: Vec<(Slot, &MarkupNode)> = chapters
        .iter()
        .enumerate()
        .flat_map(|(chapter, nodes)| {
            nodes
                .iter()
                .enumerate()
                .map(move |(position, node)| (Slot { chapter, position }, node))
        })
        .collect();

    let on_page: Vec<&(Slot, &MarkupNode)> = flat.iter().filter(|(_, n)| n.page == Some(page)).collect();

    if on_page.iter().any(|(_, n)| n.y_mid.is_some()) {
        let below = on_page
            .iter()
            .find(|(_, n)| n.y_mid.map_or(false, |y| y > image.origin_y));
        if let Some((slot, _)) = below {
            return *slot;
        }
        if let Some((last, _)) = on_page.last() {
            return after_trailing_untagged(chapters, *last);
        }
    }

    if let Some((first, _)) = on_page.first() {
        return *first;
    }

    if let Some((slot, _)) = flat.iter().find(|(_, n)| n.page.map_or(false, |p| p > page)) {
        return *slot;
    }

    let last = chapters.len() - 1;
    Slot {
        chapter: last,
        position: chapters[last].len(),
    }
}

/// Slot after `slot`, skipping untagged separators that trail it in the same chapter.
fn after_trailing_untagged(chapters: &[Vec<MarkupNode>], slot: Slot) -> Slot {
    let nodes = &chapters[slot.chapter];
    let mut position = slot.position + 1;
    while position < nodes.len() && nodes[position].page.is_none() {
        position += 1;
    }
    Slot {
        chapter: slot.chapter,
        position,
    }
}

fn splice(nodes: &[MarkupNode], figures: &[&(Slot, usize, MarkupBlock)]) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(nodes.len() + figures.len());
    let mut pending = figures.iter().peekable();

    for (position, node) in nodes.iter().enumerate() {
        while let Some((_, _, figure)) = pending.next_if(|(slot, _, _)| slot.position <= position) {
            lines.push(figure.to_markup());
        }
        lines.push(node.fragment.clone());
    }
    for (_, _, figure) in pending {
        lines.push(figure.to_markup());
    }
    lines.join("\n")
}

/// Split markup into top-level nodes; malformed markup becomes one untagged node.
fn scan_nodes(markup: &str) -> Vec<MarkupNode> {
    match try_scan_nodes(markup) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!("⚠️  Could not scan chapter markup, images go after it: {}", e);
            if markup.trim().is_empty() {
                Vec::new()
            } else {
                vec![MarkupNode {
                    fragment: markup.to_string(),
                    page: None,
                    y_mid: None,
                }]
            }
        }
    }
}

fn try_scan_nodes(markup: &str) -> Result<Vec<MarkupNode>> {
    let mut reader = Reader::from_str(markup);
    let mut nodes = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut provenance_of_open = (None, None);

    loop {
        let before = reader.buffer_position();
        let event = reader.read_event()?;
        let after = reader.buffer_position();

        match event {
            Event::Eof => break,
            Event::Start(e) => {
                if depth == 0 {
                    start = before;
                    provenance_of_open = provenance(&e);
                }
                depth += 1;
            }
            Event::End(_) => {
                if depth == 0 {
                    bail!("unexpected closing tag at byte {}", before);
                }
                depth -= 1;
                if depth == 0 {
                    let (page, y_mid) = provenance_of_open;
                    nodes.push(MarkupNode {
                        fragment: markup[start..after].trim().to_string(),
                        page,
                        y_mid,
                    });
                }
            }
            Event::Empty(e) if depth == 0 => {
                let (page, y_mid) = provenance(&e);
                nodes.push(MarkupNode {
                    fragment: markup[before..after].trim().to_string(),
                    page,
                    y_mid,
                });
            }
            _ if depth == 0 => {
                let fragment = markup[before..after].trim();
                if !fragment.is_empty() {
                    nodes.push(MarkupNode {
                        fragment: fragment.to_string(),
                        page: None,
                        y_mid: None,
                    });
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        bail!("unclosed element in chapter markup");
    }
    Ok(nodes)
}

fn provenance(element: &BytesStart) -> (Option<u32>, Option<f32>) {
    let mut page = None;
    let mut y_mid = None;
    for attr in element.attributes().flatten() {
        let key = attr.key.as_ref();
        if key == ATTR_PAGE.as_bytes() {
            page = attr.unescape_value().ok().and_then(|v| v.trim().parse().ok());
        } else if key == ATTR_Y_MID.as_bytes() {
            y_mid = attr.unescape_value().ok().and_then(|v| v.trim().parse().ok());
        }
    }
    (page, y_mid)
}
