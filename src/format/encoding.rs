use std::fmt;

use serde::{Deserialize, Serialize};

const UTF8_BOM: char = '\u{feff}';

/// The encoding a byte buffer was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// Valid UTF-8.
    Utf8,
    /// ISO-8859-1: each byte is one code point.
    Latin1,
    /// UTF-8 with invalid sequences replaced.
    Utf8Lossy,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Utf8Lossy => "utf-8 (lossy)",
        })
    }
}

/// What to do with input that is not valid UTF-8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackEncoding {
    /// Decode as ISO-8859-1, the charset most BC3 files are written in.
    #[default]
    Latin1,
    /// Decode as UTF-8, replacing invalid sequences.
    Utf8Lossy,
}

/// Decodes raw bytes into text.
///
/// UTF-8 is used when the bytes are valid UTF-8; otherwise the fallback
/// applies. A leading byte-order mark is removed.
#[must_use]
pub fn decode_text(raw: &[u8], fallback: FallbackEncoding) -> (String, Encoding) {
    let (text, encoding) = match std::str::from_utf8(raw) {
        Ok(text) => (text.to_owned(), Encoding::Utf8),
        Err(_) => match fallback {
            FallbackEncoding::Latin1 => (raw.iter().copied().map(char::from).collect(), Encoding::Latin1),
            FallbackEncoding::Utf8Lossy => (
                String::from_utf8_lossy(raw).into_owned(),
                Encoding::Utf8Lossy,
            ),
        },
    };

    match text.strip_prefix(UTF8_BOM) {
        Some(stripped) => (stripped.to_owned(), encoding),
        None => (text, encoding),
    }
}
