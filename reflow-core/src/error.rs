//! Error types for reflow-core.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Phase boundaries at which a conversion can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Segmentation,
    Assembly,
    Rendering,
    Translation,
    Correlation,
    /// After the last optional phase, before output is handed over
    Packaging,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Segmentation => "segmentation",
            Phase::Assembly => "assembly",
            Phase::Rendering => "rendering",
            Phase::Translation => "translation",
            Phase::Correlation => "correlation",
            Phase::Packaging => "packaging",
        };
        f.write_str(name)
    }
}

/// Caller-visible conversion failures.
#[derive(Error, Debug)]
pub enum ReflowError {
    /// No text and no images anywhere in the document.
    #[error("document has no text and no images")]
    EmptyDocument,

    #[error("conversion cancelled before {0}")]
    Cancelled(Phase),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single call to the translation collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(String),

    #[error("malformed translation response: {0}")]
    MalformedResponse(String),

    #[error("translation request timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, ReflowError>;
