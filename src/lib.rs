//! Reading FIEBDC-3 (BC3) construction budgets.
//!
//! A BC3 file is a flat list of records describing concepts (chapters, work
//! items, resources), how each concept decomposes into others, and how much
//! of each was measured. [`parse`] turns the text into an indexed
//! [`Document`]; [`resolve`] walks the decomposition graph from its roots and
//! produces priced [`ResolvedLineItem`]s.
//!
//! ```
//! let document = bc3::parse("~C|R##||Budget||\n~C|E01|m3|Excavation|12.5|\n~D|R|E01\\1\\|\n~M|R\\E01||4||");
//! let resolution = bc3::resolve(&document).unwrap();
//!
//! assert_eq!(resolution.items().len(), 2);
//! assert_eq!(resolution.total(), "50".parse().unwrap());
//! ```
//!
//! Neither step fails on bad data: malformed records, dangling references
//! and cycles are reported as [`Diagnostic`]s alongside the result.

pub mod domain;
pub use domain::{
    resolve, resolve_from, resolve_with, Code, Concept, ConceptKind, Config, Diagnostic,
    DiagnosticKind, Document, Resolution, ResolveError, ResolveOptions, ResolvedLineItem,
};

/// Parsing the BC3 text format.
pub mod format;
pub use format::{parse, parse_bytes, ParseOptions};
