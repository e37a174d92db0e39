use std::{collections::BTreeMap, fmt};

use serde::Serialize;

/// The kind of data-quality problem a [`Diagnostic`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A record could not be decoded and was skipped.
    MalformedRecord,
    /// A decomposition names a child with no concept record.
    DanglingReference,
    /// A decomposition edge leads back onto the path being resolved.
    Cycle,
    /// An amount exceeded the decimal range and was saturated.
    Overflow,
    /// Resolution stopped at the item limit.
    Truncated,
}

impl DiagnosticKind {
    const fn label(self, count: usize) -> &'static str {
        match (self, count) {
            (Self::MalformedRecord, 1) => "malformed record",
            (Self::MalformedRecord, _) => "malformed records",
            (Self::DanglingReference, 1) => "dangling reference",
            (Self::DanglingReference, _) => "dangling references",
            (Self::Cycle, 1) => "cycle",
            (Self::Cycle, _) => "cycles",
            (Self::Overflow, 1) => "overflow",
            (Self::Overflow, _) => "overflows",
            (Self::Truncated, 1) => "truncated resolution",
            (Self::Truncated, _) => "truncated resolutions",
        }
    }
}

/// A non-fatal problem found while parsing or resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// Position of the offending record, when the problem belongs to one.
    pub record_index: Option<usize>,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn malformed(record_index: usize, message: impl fmt::Display) -> Self {
        Self {
            kind: DiagnosticKind::MalformedRecord,
            record_index: Some(record_index),
            message: message.to_string(),
        }
    }

    pub(crate) const fn dangling(record_index: Option<usize>, message: String) -> Self {
        Self {
            kind: DiagnosticKind::DanglingReference,
            record_index,
            message,
        }
    }

    pub(crate) const fn cycle(record_index: Option<usize>, message: String) -> Self {
        Self {
            kind: DiagnosticKind::Cycle,
            record_index,
            message,
        }
    }

    pub(crate) const fn overflow(record_index: Option<usize>, message: String) -> Self {
        Self {
            kind: DiagnosticKind::Overflow,
            record_index,
            message,
        }
    }

    pub(crate) const fn truncated(message: String) -> Self {
        Self {
            kind: DiagnosticKind::Truncated,
            record_index: None,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record_index {
            Some(index) => write!(f, "record {index}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Number of diagnostics of each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSummary(BTreeMap<DiagnosticKind, usize>);

impl DiagnosticSummary {
    /// Counts the given diagnostics.
    pub fn from_diagnostics<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> Self {
        let mut counts = BTreeMap::new();
        for diagnostic in diagnostics {
            *counts.entry(diagnostic.kind).or_insert(0) += 1;
        }
        Self(counts)
    }

    /// Number of diagnostics of the given kind.
    #[must_use]
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of diagnostics.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Whether no diagnostics were counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no diagnostics");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(kind, count)| format!("{count} {}", kind.label(*count)))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
