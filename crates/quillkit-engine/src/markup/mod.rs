//! Persisted representation: sanitized HTML-shaped markup.
//!
//! The writer emits a canonical encoding (ordered attributes, no inter-tag
//! whitespace) and the parser accepts exactly the surface the writer
//! produces: structured tags, style spans, and custom blocks whose payload
//! lives entirely in `data-` attributes on the block's root element. This is
//! a persistence codec, not a general HTML importer.

mod parser;
pub mod sanitize;
mod writer;

pub use parser::parse_document;
pub use sanitize::{AttributeSanitizer, Sanitizer};
pub use writer::serialize;

use thiserror::Error;

/// Failures while decoding persisted markup.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("unknown tag `<{name}>` at byte {at}")]
    UnknownTag { name: String, at: usize },
    #[error("unexpected closing tag `</{name}>` at byte {at}")]
    UnexpectedClose { name: String, at: usize },
    #[error("unterminated markup: `<{name}>` was never closed")]
    Unclosed { name: String },
    #[error("malformed tag at byte {at}")]
    MalformedTag { at: usize },
    #[error("text content is not allowed directly under `{parent}` (byte {at})")]
    StrayText { parent: String, at: usize },
    #[error("custom block at byte {at} has no `data-block-type`")]
    MissingBlockType { at: usize },
}
