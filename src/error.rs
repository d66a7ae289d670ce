//! Typed error surface for the parts of the pipeline that are allowed to fail
//! loudly. Everything else — malformed markup, missing mapping files,
//! unresolved XBRL tags — is absorbed and degrades to a default value; see
//! the module docs on `preprocessor` and `standardization` for where that
//! happens.

use thiserror::Error;

/// Errors raised by the parser's public entry points.
///
/// Only input errors and streaming invariant violations reach callers as
/// `Err`. Parse-recoverable issues (unclosed tags, bad attributes) and
/// standardization-soft issues (unmapped tags, missing mapping files) never
/// produce a `ParserError`; they degrade to partial results instead.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("HTML input cannot be None")]
    NullInput,

    #[error("HTML must be string or bytes, got {received}")]
    InvalidInputType { received: &'static str },

    #[error("document too large: {actual} bytes exceeds max_document_size of {max} bytes")]
    DocumentTooLarge { actual: usize, max: usize },

    #[error("streaming invariant violated: {0}")]
    StreamingInvariant(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ParserResult<T> = Result<T, ParserError>;
