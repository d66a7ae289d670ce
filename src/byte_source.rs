//! Size-bounded, encoding-normalizing input adapter.
//!
//! `ByteSource` is the only place a raw filing enters the pipeline. It
//! rejects oversized input before any parsing work happens, and it always
//! hands the rest of the pipeline a `String` — decoding bytes as UTF-8 and
//! falling back to Latin-1 (which can decode any byte sequence) rather than
//! failing on the rare filing with non-UTF-8 byte soup.

use crate::error::ParserError;

/// What the caller handed us, before we've validated or decoded it.
pub enum ByteSourceInput {
    Bytes(Vec<u8>),
    Str(String),
}

impl From<Vec<u8>> for ByteSourceInput {
    fn from(bytes: Vec<u8>) -> Self {
        ByteSourceInput::Bytes(bytes)
    }
}

impl From<String> for ByteSourceInput {
    fn from(s: String) -> Self {
        ByteSourceInput::Str(s)
    }
}

impl From<&str> for ByteSourceInput {
    fn from(s: &str) -> Self {
        ByteSourceInput::Str(s.to_string())
    }
}

pub struct ByteSource {
    html: String,
    byte_size: usize,
}

impl ByteSource {
    /// Build a `ByteSource`, decoding and enforcing `max_document_size`.
    pub fn new(input: ByteSourceInput, max_document_size: usize) -> Result<Self, ParserError> {
        let (html, byte_size) = match input {
            ByteSourceInput::Bytes(bytes) => {
                let byte_size = bytes.len();
                let html = match String::from_utf8(bytes) {
                    Ok(s) => s,
                    Err(err) => decode_latin1(err.into_bytes()),
                };
                (html, byte_size)
            }
            ByteSourceInput::Str(s) => {
                let byte_size = s.len();
                (s, byte_size)
            }
        };

        if byte_size > max_document_size {
            return Err(ParserError::DocumentTooLarge {
                actual: byte_size,
                max: max_document_size,
            });
        }

        Ok(Self { html, byte_size })
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn should_stream(&self, streaming_threshold: usize) -> bool {
        self.byte_size >= streaming_threshold
    }
}

/// Decode every byte as Latin-1 (ISO-8859-1), which maps 1:1 onto the first
/// 256 Unicode scalar values and therefore never fails.
fn decode_latin1(bytes: Vec<u8>) -> String {
    bytes.into_iter().map(|b| b as char).collect()
}

/// Type-erased entry point for callers crossing a dynamic boundary (FFI,
/// scripting hosts) where `parse_html`'s static `impl Into<ByteSourceInput>`
/// can't apply. Faithfully reproduces the "wrong type" typed error the
/// dynamically-typed original raises for non-string/non-bytes input.
pub fn byte_source_from_any(
    value: &dyn std::any::Any,
    max_document_size: usize,
) -> Result<ByteSource, ParserError> {
    if let Some(s) = value.downcast_ref::<String>() {
        return ByteSource::new(ByteSourceInput::Str(s.clone()), max_document_size);
    }
    if let Some(s) = value.downcast_ref::<&str>() {
        return ByteSource::new(ByteSourceInput::Str((*s).to_string()), max_document_size);
    }
    if let Some(bytes) = value.downcast_ref::<Vec<u8>>() {
        return ByteSource::new(ByteSourceInput::Bytes(bytes.clone()), max_document_size);
    }
    Err(ParserError::InvalidInputType {
        received: "unknown (not string or bytes)",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_succeeds() {
        let source = ByteSource::new(ByteSourceInput::Str(String::new()), 100).unwrap();
        assert_eq!(source.html(), "");
    }

    #[test]
    fn exactly_at_limit_succeeds() {
        let html = "a".repeat(10);
        let source = ByteSource::new(ByteSourceInput::Str(html.clone()), 10).unwrap();
        assert_eq!(source.byte_size(), 10);
    }

    #[test]
    fn one_byte_over_limit_fails() {
        let html = "a".repeat(11);
        let err = ByteSource::new(ByteSourceInput::Str(html), 10).unwrap_err();
        match err {
            ParserError::DocumentTooLarge { actual, max } => {
                assert_eq!(actual, 11);
                assert_eq!(max, 10);
            }
            other => panic!("expected DocumentTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        let bytes = vec![b'h', b'i', 0xE9]; // 0xE9 is invalid continuation in UTF-8
        let source = ByteSource::new(ByteSourceInput::Bytes(bytes), 100).unwrap();
        assert_eq!(source.html(), "hi\u{e9}");
    }

    #[test]
    fn should_stream_respects_threshold() {
        let source = ByteSource::new(ByteSourceInput::Str("x".repeat(20)), 100).unwrap();
        assert!(source.should_stream(20));
        assert!(!source.should_stream(21));
    }
}
