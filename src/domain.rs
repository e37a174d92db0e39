//! Domain model for budget documents.
//!
//! This module contains the core types: concept codes, concepts and their
//! decompositions and measurements, the indexed [`Document`], the resolver
//! that flattens it into line items, and configuration.

mod code;
pub use code::{Code, CodeMarker, InvalidCodeError};

mod concept;
pub use concept::{Concept, ConceptKind, DecompositionEntry, MeasurementLine, ResourceClass};

mod config;
pub use config::{Config, ConfigError};

mod diagnostic;
pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSummary};

mod document;
pub use document::{Document, DocumentBuilder, Metadata};

/// Flattening the decomposition graph into line items.
pub mod resolve;
pub use resolve::{
    resolve, resolve_from, resolve_with, EmptyReason, Resolution, ResolveError, ResolveOptions,
    ResolvedLineItem,
};
