use super::columns::assign_column;
use crate::config::{ClassifierConfig, ParagraphStrategyKind};
use crate::types::*;

/// Groups a page's runs into untyped paragraph blocks.
///
/// Both strategies emit `BlockType::Paragraph` blocks; typing happens in the
/// classification rules. Every run of the page ends up in exactly one block.
pub trait ParagraphStrategy {
    fn group_blocks(
        &self,
        page: &PageContent,
        columns: &[Column],
        stats: &FontStatistics,
    ) -> Vec<Block>;

    fn name(&self) -> &str;
}

pub fn strategy_for(config: &ClassifierConfig) -> Box<dyn ParagraphStrategy + '_> {
    match config.strategy {
        ParagraphStrategyKind::ColumnAware => Box::new(ColumnAwareStrategy::new(config)),
        ParagraphStrategyKind::GlobalVertical => Box::new(GlobalVerticalStrategy::new(config)),
    }
}

/// Reads each column top to bottom, columns left to right.
pub struct ColumnAwareStrategy<'a> {
    config: &'a ClassifierConfig,
}

impl<'a> ColumnAwareStrategy<'a> {
    pub fn new(config: &'a ClassifierConfig) -> Self {
        Self { config }
    }
}

impl<'a> ParagraphStrategy for ColumnAwareStrategy<'a> {
    fn group_blocks(
        &self,
        page: &PageContent,
        columns: &[Column],
        stats: &FontStatistics,
    ) -> Vec<Block> {
        let columns: Vec<Column> = if columns.is_empty() {
            vec![Column::full_width(page.width)]
        } else {
            columns.to_vec()
        };

        let mut per_column: Vec<Vec<usize>> = vec![Vec::new(); columns.len()];
        for (index, run) in page.runs.iter().enumerate() {
            per_column[assign_column(&columns, run.center_x())].push(index);
        }

        let flow_builder = FlowBuilder::new(self.config, page, stats);
        let mut blocks = Vec::new();
        for (column_index, indices) in per_column.iter().enumerate() {
            if indices.is_empty() {
                continue;
            }
            let column = &columns[column_index];
            blocks.extend(flow_builder.build(indices, column.x_start, column.width(), |_| {
                column_index
            }));
        }
        blocks
    }

    fn name(&self) -> &str {
        "ColumnAware"
    }
}

/// One vertical flow per page; column index is informational only.
pub struct GlobalVerticalStrategy<'a> {
    config: &'a ClassifierConfig,
}

impl<'a> GlobalVerticalStrategy<'a> {
    pub fn new(config: &'a ClassifierConfig) -> Self {
        Self { config }
    }
}

impl<'a> ParagraphStrategy for GlobalVerticalStrategy<'a> {
    fn group_blocks(
        &self,
        page: &PageContent,
        columns: &[Column],
        stats: &FontStatistics,
    ) -> Vec<Block> {
        let indices: Vec<usize> = (0..page.runs.len()).collect();
        if indices.is_empty() {
            return Vec::new();
        }

        let flow_builder = FlowBuilder::new(self.config, page, stats);
        let mut blocks = flow_builder.build(&indices, 0.0, page.width, |bbox| {
            if columns.is_empty() {
                0
            } else {
                assign_column(columns, bbox.x_start)
            }
        });
        blocks.sort_by(|a, b| a.bounding_box.y_start.total_cmp(&b.bounding_box.y_start));
        blocks
    }

    fn name(&self) -> &str {
        "GlobalVertical"
    }
}

/// A visual line: runs sharing a baseline band, left to right.
#[derive(Debug, Clone)]
struct Line {
    runs: Vec<usize>,
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    font_size: f32,
    text: String,
}

struct FlowBuilder<'a> {
    config: &'a ClassifierConfig,
    page: &'a PageContent,
    average_font: f32,
}

impl<'a> FlowBuilder<'a> {
    fn new(config: &'a ClassifierConfig, page: &'a PageContent, stats: &FontStatistics) -> Self {
        Self {
            config,
            page,
            average_font: stats.average,
        }
    }

    /// Segment one reading flow (a column or a whole page) into blocks.
    fn build<F>(&self, indices: &[usize], x_start: f32, width: f32, column_of: F) -> Vec<Block>
    where
        F: Fn(&BoundingBox) -> usize,
    {
        let lines = self.group_lines(indices);
        let margin = self.common_left_margin(indices);

        let mut groups: Vec<Vec<Line>> = Vec::new();
        for line in lines {
            let split = match groups.last().and_then(|g| g.last()) {
                Some(prev) => self.starts_new_block(prev, &line, x_start + width, margin),
                None => true,
            };
            if split {
                groups.push(vec![line]);
            } else if let Some(group) = groups.last_mut() {
                group.push(line);
            }
        }

        groups
            .iter()
            .map(|lines| {
                let mut block = self.build_block(lines);
                block.column_index = column_of(&block.bounding_box);
                block
            })
            .collect()
    }

    fn group_lines(&self, indices: &[usize]) -> Vec<Line> {
        let runs = &self.page.runs;
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            runs[a]
                .origin_y
                .total_cmp(&runs[b].origin_y)
                .then(runs[a].origin_x.total_cmp(&runs[b].origin_x))
        });

        let mut line_runs: Vec<Vec<usize>> = Vec::new();
        for index in sorted {
            let run = &runs[index];
            let joins = line_runs.last().and_then(|l| l.first()).is_some_and(|&first| {
                let anchor = &runs[first];
                let tolerance =
                    self.config.line_merge_ratio * anchor.font_size.max(run.font_size);
                (run.origin_y - anchor.origin_y).abs() <= tolerance
            });
            if joins {
                if let Some(line) = line_runs.last_mut() {
                    line.push(index);
                }
            } else {
                line_runs.push(vec![index]);
            }
        }

        line_runs
            .into_iter()
            .map(|mut members| {
                members.sort_by(|&a, &b| runs[a].origin_x.total_cmp(&runs[b].origin_x));
                self.make_line(members)
            })
            .collect()
    }

    fn make_line(&self, members: Vec<usize>) -> Line {
        let runs = &self.page.runs;
        let mut text = String::new();
        let mut previous: Option<&TextGlyphRun> = None;
        for &index in &members {
            let run = &runs[index];
            if let Some(prev) = previous {
                let gap = run.origin_x - prev.right();
                if prev.width <= 0.0 || gap > self.config.word_gap_ratio * run.font_size {
                    text.push(' ');
                }
            }
            text.push_str(&run.text);
            previous = Some(run);
        }

        let sized: Vec<f32> = members
            .iter()
            .map(|&i| &runs[i])
            .filter(|r| !r.text.trim().is_empty())
            .map(|r| r.font_size)
            .collect();
        let font_size = mean(&sized)
            .unwrap_or_else(|| mean(&members.iter().map(|&i| runs[i].font_size).collect::<Vec<_>>()).unwrap_or(0.0));

        Line {
            left: members.iter().map(|&i| runs[i].origin_x).fold(f32::INFINITY, f32::min),
            right: members.iter().map(|&i| runs[i].right()).fold(f32::NEG_INFINITY, f32::max),
            top: members.iter().map(|&i| runs[i].origin_y).fold(f32::INFINITY, f32::min),
            bottom: members.iter().map(|&i| runs[i].bottom()).fold(f32::NEG_INFINITY, f32::max),
            font_size,
            text: collapse_whitespace(&text),
            runs: members,
        }
    }

    /// Percentile of the flow's run X-origins.
    fn common_left_margin(&self, indices: &[usize]) -> f32 {
        let mut xs: Vec<f32> = indices
            .iter()
            .map(|&i| &self.page.runs[i])
            .filter(|r| !r.text.trim().is_empty())
            .map(|r| r.origin_x)
            .collect();
        if xs.is_empty() {
            return 0.0;
        }
        xs.sort_by(|a, b| a.total_cmp(b));
        let position = (xs.len() as f32 * self.config.left_margin_percentile).floor() as usize;
        xs[position.min(xs.len() - 1)]
    }

    fn starts_new_block(
        &self,
        prev: &Line,
        current: &Line,
        flow_end: f32,
        margin: f32,
    ) -> bool {
        let config = self.config;

        // (a) paragraph gap
        let gap = current.top - prev.bottom;
        if gap > config.paragraph_gap_ratio * self.average_font {
            return true;
        }

        // (b) font size change
        if (current.font_size - prev.font_size).abs() > config.font_size_change {
            return true;
        }

        // (c) short previous line followed by an indent; fill is measured from the margin
        let indent = current.left - margin;
        let text_width = flow_end - margin;
        let prev_extent = if text_width > 0.0 {
            (prev.right - margin) / text_width
        } else {
            1.0
        };
        if prev_extent < config.short_line_ratio && indent > config.indent_tolerance {
            return true;
        }

        // (d) strong indent
        indent > config.strong_indent
    }

    fn build_block(&self, lines: &[Line]) -> Block {
        let runs = &self.page.runs;
        let mut members: Vec<usize> = lines.iter().flat_map(|l| l.runs.iter().copied()).collect();
        members.sort_unstable();

        let bounding_box = members
            .iter()
            .map(|&i| BoundingBox::from_run(&runs[i]))
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_default();

        let sized: Vec<f32> = members
            .iter()
            .map(|&i| &runs[i])
            .filter(|r| !r.text.trim().is_empty())
            .map(|r| r.font_size)
            .collect();

        Block {
            block_type: BlockType::Paragraph,
            importance: 0,
            text: join_lines(lines.iter().map(|l| l.text.as_str())),
            bounding_box,
            page_number: self.page.page_number,
            column_index: 0,
            font_size: mean(&sized).unwrap_or(0.0),
            runs: members,
        }
    }
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join line texts with single spaces, undoing end-of-line hyphenation when
/// the next line starts with a lowercase letter.
pub fn join_lines<'s, I>(lines: I) -> String
where
    I: IntoIterator<Item = &'s str>,
{
    let mut joined = String::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if joined.is_empty() {
            joined.push_str(line);
            continue;
        }
        let continues_word = joined.ends_with('-')
            && line.chars().next().is_some_and(char::is_lowercase);
        if continues_word {
            joined.pop();
        } else {
            joined.push(' ');
        }
        joined.push_str(line);
    }
    joined
}
