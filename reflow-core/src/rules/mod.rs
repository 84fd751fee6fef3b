// Layout rules - page segmentation and block classification
// - engine.rs: LayoutEngine and the ParseRule pipeline
// - columns.rs: column detection (Page Segmenter)
// - paragraphs.rs: paragraph strategies (column-aware / global vertical)
// - classification.rs: heading, header/footer and caption rules
// - validation.rs: reading-order diagnostics over assembled chapters

pub mod classification;
pub mod columns;
pub mod engine;
pub mod paragraphs;
pub mod validation;

pub use engine::*;
