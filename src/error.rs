//! Crate-level error type

use crate::core::attributes::AttributeError;
use crate::core::tokenizer::ParseError;
use thiserror::Error;

/// Boxed error raised by an input source
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the node streams
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed markup
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Malformed attribute string during enrichment
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// The input stream failed
    #[error("input source failed: {0}")]
    Source(#[source] BoxError),

    /// Input sent after the transform was closed
    #[error("transform is closed")]
    Closed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
