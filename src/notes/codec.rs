//! Buffer codec boundary.
//!
//! The engine never interprets note content itself; conversion between the
//! canonical serialized text and the in-memory editable document is supplied
//! by a [`Codec`] implementation. A rich-text embedder plugs in its own
//! document model here; [`PlainTextCodec`] is the trivial implementation used
//! by plain-text embedders and tests.
//!
//! `serialize(parse(x))` must be semantically equivalent to `x` for any `x`
//! previously produced by `serialize`.

use thiserror::Error;

/// Raised when canonical content cannot be parsed into a buffer document.
/// Callers fall back to inserting the raw text via [`Codec::raw`].
#[derive(Debug, Clone, Error)]
#[error("malformed document: {0}")]
pub struct CodecError(pub String);

/// Reversible conversion between canonical text and a buffer document.
pub trait Codec {
    /// The in-memory editable document type.
    type Doc: Clone;

    /// Parse canonical text into a buffer document. Fails on malformed input.
    fn parse(&self, text: &str) -> Result<Self::Doc, CodecError>;

    /// Serialize a buffer document back to canonical text.
    fn serialize(&self, doc: &Self::Doc) -> String;

    /// Lossless fallback: wrap raw text as a document without interpretation.
    fn raw(&self, text: &str) -> Self::Doc;
}

/// Identity codec: the document *is* the canonical text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextCodec;

impl Codec for PlainTextCodec {
    type Doc = String;

    fn parse(&self, text: &str) -> Result<String, CodecError> {
        Ok(text.to_string())
    }

    fn serialize(&self, doc: &String) -> String {
        doc.clone()
    }

    fn raw(&self, text: &str) -> String {
        text.to_string()
    }
}
