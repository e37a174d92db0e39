use std::{borrow::Borrow, fmt, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};

/// Suffix character that marks chapter and root concepts.
const MARKER: char = '#';

/// A validated concept code.
///
/// Codes are trimmed and stripped of the trailing `#` markers the format uses
/// to flag chapters (`CAP01#`) and the root concept (`OBRA##`). The marker
/// is reported separately through [`CodeMarker`], so `CAP01#` and `CAP01`
/// name the same concept.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

/// The marker suffix carried by a code as written in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeMarker {
    /// No marker.
    #[default]
    None,
    /// A single `#`: the concept is a chapter.
    Chapter,
    /// Two or more `#`: the concept is the root of the budget.
    Root,
}

impl CodeMarker {
    /// Reads the marker from a raw code.
    #[must_use]
    pub fn of(raw: &str) -> Self {
        match raw.trim().chars().rev().take_while(|&c| c == MARKER).count() {
            0 => Self::None,
            1 => Self::Chapter,
            _ => Self::Root,
        }
    }
}

impl Code {
    /// Creates a code from raw text.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCodeError`] if nothing is left once whitespace and
    /// marker suffixes are removed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidCodeError> {
        let raw = raw.as_ref();
        let code = raw.trim().trim_end_matches(MARKER).trim_end();
        if code.is_empty() {
            return Err(InvalidCodeError(raw.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    /// Creates a code and returns the marker it was written with.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCodeError`] if the code is empty.
    pub fn with_marker(raw: &str) -> Result<(Self, CodeMarker), InvalidCodeError> {
        Ok((Self::new(raw)?, CodeMarker::of(raw)))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Code {
    type Error = InvalidCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Code {
    type Error = InvalidCodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl FromStr for Code {
    type Err = InvalidCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Code {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for Code {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a code is empty after normalization.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid concept code '{0}': must contain something besides whitespace and '#' markers")]
pub struct InvalidCodeError(String);
