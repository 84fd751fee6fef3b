// Reflow Core Library
//
// Rebuilds reading order, paragraphs and chapters from positioned glyph runs,
// renders structure-tagged markup, and optionally translates it and splices
// extracted images back in. Main interface: DocumentConverter.

pub mod cache;
pub mod chapters;
pub mod config;
pub mod error;
pub mod images;
pub mod markup;
pub mod processor;
pub mod rules;
pub mod sources;
pub mod storage;
pub mod translation;
pub mod types;

// Re-export main types and functions for easy use
pub use config::ReflowConfig;
pub use error::{Phase, ReflowError, TranslationError};
pub use processor::{CancellationToken, DocumentConverter, PipelineStages};
pub use sources::{JsonLayoutSource, LayoutSource, XhtmlLayoutSource};
pub use translation::Translator;
pub use types::*;
