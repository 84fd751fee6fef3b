use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

// Structural diagnostics over assembled chapters. Never alters its input.
pub struct ChapterValidator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub quality_score: f32,
    pub total_blocks: usize,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            issues: Vec::new(),
            quality_score: 1.0,
            total_blocks: 0,
        }
    }
}

impl ValidationReport {
    pub fn reading_order_inversions(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, ValidationIssue::ReadingOrderInversion { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ValidationIssue {
    /// Two same-page blocks of one chapter out of vertical order
    ReadingOrderInversion {
        chapter: usize,
        position: usize,
        page: u32,
        previous_y: f32,
        current_y: f32,
    },
    PageRegression {
        chapter: usize,
        position: usize,
        from_page: u32,
        to_page: u32,
    },
    SuspiciousHeading {
        chapter: usize,
        position: usize,
        text: String,
        reason: String,
    },
    EmptyChapter {
        chapter: usize,
        title: String,
    },
}

impl Default for ChapterValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, chapters: &[Chapter]) -> ValidationReport {
        let mut issues = Vec::new();
        let total_blocks = chapters.iter().map(|c| c.blocks.len()).sum();

        for (index, chapter) in chapters.iter().enumerate() {
            if chapter.blocks.is_empty() {
                issues.push(ValidationIssue::EmptyChapter {
                    chapter: index,
                    title: chapter.title.clone(),
                });
                continue;
            }
            self.validate_reading_order(index, chapter, &mut issues);
            self.validate_page_sequence(index, chapter, &mut issues);
            self.validate_heading_quality(index, chapter, &mut issues);
        }

        let quality_score = if total_blocks == 0 {
            1.0
        } else {
            (1.0 - (issues.len() as f32 / total_blocks as f32)).max(0.0)
        };

        let report = ValidationReport {
            issues,
            quality_score,
            total_blocks,
        };
        self.log_report(&report);
        report
    }

    /// Same-page blocks must appear in non-decreasing vertical order,
    /// including pairs separated by blocks from other pages
    fn validate_reading_order(
        &self,
        chapter_index: usize,
        chapter: &Chapter,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let mut deepest_start: HashMap<u32, f32> = HashMap::new();
        for (position, block) in chapter.blocks.iter().enumerate() {
            let y_start = block.bounding_box.y_start;
            match deepest_start.get_mut(&block.page_number) {
                Some(previous_y) if y_start < *previous_y => {
                    issues.push(ValidationIssue::ReadingOrderInversion {
                        chapter: chapter_index,
                        position,
                        page: block.page_number,
                        previous_y: *previous_y,
                        current_y: y_start,
                    });
                }
                Some(previous_y) => *previous_y = y_start,
                None => {
                    deepest_start.insert(block.page_number, y_start);
                }
            }
        }
    }

    fn validate_page_sequence(
        &self,
        chapter_index: usize,
        chapter: &Chapter,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (position, pair) in chapter.blocks.windows(2).enumerate() {
            if pair[1].page_number < pair[0].page_number {
                issues.push(ValidationIssue::PageRegression {
                    chapter: chapter_index,
                    position: position + 1,
                    from_page: pair[0].page_number,
                    to_page: pair[1].page_number,
                });
            }
        }
    }

    fn validate_heading_quality(
        &self,
        chapter_index: usize,
        chapter: &Chapter,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (position, block) in chapter.blocks.iter().enumerate() {
            if block.block_type != BlockType::Heading {
                continue;
            }
            let text = block.text.trim();
            let chars = text.chars().count();
            if chars < 3 {
                issues.push(ValidationIssue::SuspiciousHeading {
                    chapter: chapter_index,
                    position,
                    text: text.to_string(),
                    reason: "Heading text too short (< 3 characters)".to_string(),
                });
            } else if chars > 200 {
                issues.push(ValidationIssue::SuspiciousHeading {
                    chapter: chapter_index,
                    position,
                    text: text.chars().take(50).collect::<String>() + "...",
                    reason: "Heading text unusually long (> 200 characters)".to_string(),
                });
            }
        }
    }

    fn log_report(&self, report: &ValidationReport) {
        info!(
            "📊 Validation: quality {:.2}/1.00, {} issues over {} blocks",
            report.quality_score,
            report.issues.len(),
            report.total_blocks
        );

        for issue in &report.issues {
            match issue {
                ValidationIssue::ReadingOrderInversion {
                    chapter,
                    position,
                    page,
                    previous_y,
                    current_y,
                } => warn!(
                    "📖 Reading order inversion in chapter {} at {} (page {}): y {:.1} after {:.1}",
                    chapter, position, page, current_y, previous_y
                ),
                ValidationIssue::PageRegression {
                    chapter,
                    position,
                    from_page,
                    to_page,
                } => warn!(
                    "📄 Page regression in chapter {} at {}: page {} after {}",
                    chapter, position, to_page, from_page
                ),
                ValidationIssue::SuspiciousHeading {
                    chapter,
                    position,
                    text,
                    reason,
                } => warn!(
                    "🤔 Suspicious heading in chapter {} at {}: \"{}\" ({})",
                    chapter, position, text, reason
                ),
                ValidationIssue::EmptyChapter { chapter, title } => {
                    warn!("🏝️  Empty chapter {}: \"{}\"", chapter, title)
                }
            }
        }
    }
}
