//! Reading the FIEBDC-3 (BC3) interchange format.
//!
//! Records are separated by `~`, fields by `|` and subfields by `\`. The
//! pipeline is strictly downward: text is split into [`RawRecord`]s, each is
//! decoded into a [`TypedRecord`], and the typed records are indexed into a
//! [`Document`].

mod encoding;
pub mod lexer;
mod number;
pub mod record;

pub use encoding::{decode_text, Encoding, FallbackEncoding};
pub use lexer::{tokenize, RawRecord};
pub use record::{decode, ChildIssue, DecodeError, TypedRecord, VersionRecord};
use tracing::instrument;

use crate::domain::{Config, Document, DocumentBuilder};

/// Options for [`parse_bytes`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Decoding used when the input is not valid UTF-8.
    pub fallback_encoding: FallbackEncoding,
    /// Name of the input, kept in the document metadata.
    pub source: Option<String>,
}

impl From<&Config> for ParseOptions {
    fn from(config: &Config) -> Self {
        Self {
            fallback_encoding: config.fallback_encoding,
            source: None,
        }
    }
}

/// Parses BC3 text into a [`Document`].
///
/// Never fails: records that cannot be decoded are skipped and reported in
/// [`Document::diagnostics`].
#[must_use]
pub fn parse(text: &str) -> Document {
    let mut builder = Document::builder();
    read_records(&mut builder, text);
    builder.build()
}

/// Decodes raw bytes and parses them into a [`Document`].
///
/// The detected encoding and the source name are stored in the document
/// metadata.
#[must_use]
pub fn parse_bytes(raw: &[u8], options: &ParseOptions) -> Document {
    let (text, encoding) = decode_text(raw, options.fallback_encoding);
    tracing::debug!(%encoding, source = ?options.source, "decoded input");

    let mut builder = Document::builder()
        .with_encoding(encoding)
        .with_source(options.source.clone());
    read_records(&mut builder, &text);
    builder.build()
}

#[instrument(level = "debug", skip_all, fields(bytes = text.len()))]
fn read_records(builder: &mut DocumentBuilder, text: &str) {
    for raw in tokenize(text) {
        match decode(&raw) {
            Ok(record) => builder.push(raw.index(), record),
            Err(error) => {
                tracing::debug!(record = raw.index(), %error, "skipping record");
                builder.reject(raw.index(), &error);
            }
        }
    }
}
