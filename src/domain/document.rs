//! The indexed budget document.
//!
//! A [`Document`] is built once per parse by a single left-to-right pass over
//! the decoded records and is never mutated afterwards. It knows nothing about
//! the text format: it only stores concepts, decompositions, measurements and
//! texts keyed by concept code.

use std::collections::{HashMap, HashSet};

use petgraph::{algo::tarjan_scc, graphmap::DiGraphMap};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use crate::{
    domain::{
        Code, CodeMarker, Concept, ConceptKind, DecompositionEntry, Diagnostic, MeasurementLine,
    },
    format::{
        record::MeasurementRecord, ChildIssue, DecodeError, Encoding, TypedRecord, VersionRecord,
    },
};

/// Where the document came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Encoding the input bytes were decoded with, when parsed from bytes.
    pub encoding: Option<Encoding>,
    /// Name of the input, when known.
    pub source: Option<String>,
    /// Number of records read, including skipped ones.
    pub record_count: usize,
}

/// An in-memory budget database.
///
/// Stores:
/// - Concepts: `HashMap<Code, Concept>`, last definition wins
/// - Discovery order: `Vec<Code>`, position of each code's first definition
/// - Decompositions: `HashMap<Code, Vec<DecompositionEntry>>`, appended
/// - Measurements: `HashMap<Code, Vec<MeasurementLine>>`, appended
/// - Measured quantities: summed per concept and per parent it was measured under
/// - Texts: `HashMap<Code, String>`, appended
#[derive(Debug, Clone, Default)]
pub struct Document {
    version: Option<VersionRecord>,
    metadata: Metadata,
    concepts: HashMap<Code, Concept>,
    discovery: Vec<Code>,
    decompositions: HashMap<Code, Vec<DecompositionEntry>>,
    measurements: HashMap<Code, Vec<MeasurementLine>>,
    quantities: HashMap<Code, Placements>,
    texts: HashMap<Code, String>,
    roots: Vec<Code>,
    diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Starts building a document.
    #[must_use]
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// Builds a document from decoded records, numbering them in order.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = TypedRecord>) -> Self {
        let mut builder = Self::builder();
        for (index, record) in records.into_iter().enumerate() {
            builder.push(index, record);
        }
        builder.build()
    }

    /// Header metadata from the last version record, if any.
    #[must_use]
    pub const fn version(&self) -> Option<&VersionRecord> {
        self.version.as_ref()
    }

    /// Where the document came from.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Looks up a concept by code.
    #[must_use]
    pub fn concept(&self, code: &str) -> Option<&Concept> {
        self.concepts.get(code)
    }

    /// All concepts, in the order their codes were first defined.
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> + '_ {
        self.discovery
            .iter()
            .filter_map(|code| self.concepts.get(code))
    }

    /// Number of distinct concepts.
    #[must_use]
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the document holds no concepts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Children of a concept, in record order.
    #[must_use]
    pub fn decomposition(&self, code: &str) -> Option<&[DecompositionEntry]> {
        self.decompositions.get(code).map(Vec::as_slice)
    }

    /// Measurement lines of a concept, in record order.
    #[must_use]
    pub fn measurements(&self, code: &str) -> Option<&[MeasurementLine]> {
        self.measurements.get(code).map(Vec::as_slice)
    }

    /// Sum of all of a concept's measurement lines, or `None` if it has none.
    #[must_use]
    pub fn measured_quantity(&self, code: &str) -> Option<Decimal> {
        let placements = self.quantities.get(code)?;
        Some(
            placements
                .by_parent
                .values()
                .chain(&placements.unscoped)
                .fold(Decimal::ZERO, |total, quantity| total.saturating_add(*quantity)),
        )
    }

    /// Quantity of a concept where it is placed under `parent`.
    ///
    /// Measurements recorded under that parent are used when there are any,
    /// otherwise those recorded without a parent. A concept measured only
    /// under other parents has no quantity here.
    #[must_use]
    pub fn measured_quantity_under(&self, parent: Option<&str>, code: &str) -> Option<Decimal> {
        let placements = self.quantities.get(code)?;
        parent
            .and_then(|parent| placements.by_parent.get(parent).copied())
            .or(placements.unscoped)
    }

    /// Long description of a concept.
    #[must_use]
    pub fn text(&self, code: &str) -> Option<&str> {
        self.texts.get(code).map(String::as_str)
    }

    /// Entry points for resolution, in discovery order.
    ///
    /// These are the concepts never referenced as a child. When every concept
    /// is somebody's child (a fully cyclic document), the concepts the file
    /// marks as root (`##`) are used instead.
    #[must_use]
    pub fn roots(&self) -> &[Code] {
        &self.roots
    }

    /// Problems found while reading the records.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// All cycles in the decomposition graph as sorted lists of codes.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<Code>> {
        let mut graph: DiGraphMap<&Code, ()> = DiGraphMap::new();
        for (parent, children) in &self.decompositions {
            for child in children {
                graph.add_edge(parent, &child.code, ());
            }
        }

        let mut cycles: Vec<Vec<Code>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [node] => graph.contains_edge(*node, *node),
                _ => true,
            })
            .map(|component| {
                let mut codes: Vec<Code> = component.into_iter().cloned().collect();
                codes.sort();
                codes
            })
            .collect();

        cycles.sort();
        cycles
    }
}

/// Measured quantities of one concept.
#[derive(Debug, Clone, Default)]
struct Placements {
    /// From records that name no parent.
    unscoped: Option<Decimal>,
    by_parent: HashMap<Code, Decimal>,
}

/// Adds two quantities, saturating on overflow and reporting it.
fn add_quantity(
    diagnostics: &mut Vec<Diagnostic>,
    index: usize,
    code: &Code,
    left: Decimal,
    right: Decimal,
) -> Decimal {
    left.checked_add(right).unwrap_or_else(|| {
        tracing::warn!(%code, record = index, "measured quantity overflow");
        diagnostics.push(Diagnostic::overflow(
            Some(index),
            format!("measured quantity of {code} overflows ({left} + {right})"),
        ));
        left.saturating_add(right)
    })
}

/// Accumulates decoded records into a [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Records the encoding the input was decoded with.
    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.document.metadata.encoding = Some(encoding);
        self
    }

    /// Records the name of the input.
    #[must_use]
    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.document.metadata.source = source;
        self
    }

    /// Adds a decoded record.
    pub fn push(&mut self, index: usize, record: TypedRecord) {
        self.document.metadata.record_count += 1;
        let document = &mut self.document;

        match record {
            TypedRecord::Version(version) => document.version = Some(version),
            TypedRecord::Concept(record) => {
                let concept = Concept {
                    code: record.code.clone(),
                    marker: record.marker,
                    unit: record.unit,
                    summary: record.summary,
                    price: record.price,
                    date: record.date,
                    type_code: record.type_code,
                    kind: ConceptKind::default(),
                    record_index: index,
                };
                if let Some(previous) = document.concepts.insert(record.code.clone(), concept) {
                    tracing::debug!(
                        code = %record.code,
                        previous = previous.record_index,
                        record = index,
                        "concept redefined"
                    );
                } else {
                    document.discovery.push(record.code);
                }
            }
            TypedRecord::Decomposition(record) => {
                for issue in &record.issues {
                    document.diagnostics.push(match issue {
                        ChildIssue::MissingCode { .. } => Diagnostic::malformed(index, issue),
                        ChildIssue::FactorOverflow { .. } => {
                            Diagnostic::overflow(Some(index), issue.to_string())
                        }
                    });
                }
                if !record.children.is_empty() {
                    document
                        .decompositions
                        .entry(record.parent)
                        .or_default()
                        .extend(record.children);
                }
            }
            TypedRecord::Measurement(record) => Self::measure(document, index, record),
            TypedRecord::Text(record) => {
                let text = document.texts.entry(record.code).or_default();
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&record.text);
            }
            TypedRecord::Unknown { marker } => {
                tracing::trace!(record = index, marker, "ignoring record type");
            }
        }
    }

    /// Adds a measurement to the quantity of its concept under its parent.
    ///
    /// The same code may be measured under several parents; each placement
    /// keeps its own sum so that no path sees another's quantities. The
    /// declared total only stands in for missing lines.
    fn measure(document: &mut Document, index: usize, record: MeasurementRecord) {
        if record.lines.is_empty() {
            return;
        }

        let code = &record.code;
        let mut quantity = Decimal::ZERO;
        for line in &record.lines {
            let line_quantity = line.checked_quantity().unwrap_or_else(|| {
                tracing::warn!(%code, record = index, "measurement line overflow");
                document.diagnostics.push(Diagnostic::overflow(
                    Some(index),
                    format!("measurement line of {code} overflows"),
                ));
                line.quantity()
            });
            quantity = add_quantity(&mut document.diagnostics, index, code, quantity, line_quantity);
        }
        if record
            .declared_total
            .is_some_and(|declared| declared != quantity)
        {
            tracing::debug!(
                %code,
                record = index,
                declared = ?record.declared_total,
                %quantity,
                "declared total differs from the lines"
            );
        }

        let placements = document.quantities.entry(code.clone()).or_default();
        let slot = match &record.parent {
            Some(parent) => placements.by_parent.entry(parent.clone()).or_default(),
            None => placements.unscoped.get_or_insert_default(),
        };
        *slot = add_quantity(&mut document.diagnostics, index, code, *slot, quantity);

        document
            .measurements
            .entry(record.code)
            .or_default()
            .extend(record.lines);
    }

    /// Notes a record that could not be decoded.
    pub fn reject(&mut self, index: usize, error: &DecodeError) {
        self.document.metadata.record_count += 1;
        self.document
            .diagnostics
            .push(Diagnostic::malformed(index, error));
    }

    /// Classifies the concepts, finds the roots and returns the document.
    #[must_use]
    #[instrument(level = "debug", skip_all)]
    pub fn build(mut self) -> Document {
        self.classify();
        self.document.roots = self.find_roots();

        tracing::debug!(
            concepts = self.document.concepts.len(),
            decompositions = self.document.decompositions.len(),
            roots = self.document.roots.len(),
            diagnostics = self.document.diagnostics.len(),
            "document built"
        );

        self.document
    }

    fn children(&self) -> HashSet<&Code> {
        self.document
            .decompositions
            .values()
            .flatten()
            .map(|child| &child.code)
            .collect()
    }

    fn classify(&mut self) {
        let document = &self.document;
        let children = self.children();
        let mut kinds: HashMap<Code, ConceptKind> = HashMap::with_capacity(document.concepts.len());

        // Leaves first: decomposed concepts look at their children's kinds.
        for (code, concept) in &document.concepts {
            if document.decompositions.contains_key(code) {
                continue;
            }
            let kind = if concept.marker != CodeMarker::None {
                ConceptKind::Chapter
            } else if document.measurements.contains_key(code) {
                ConceptKind::SimpleItem
            } else if concept.resource_class().is_some()
                || (children.contains(code) && concept.is_priced())
            {
                ConceptKind::Resource
            } else {
                ConceptKind::Unclassified
            };
            kinds.insert(code.clone(), kind);
        }

        for (code, decomposition) in &document.decompositions {
            let Some(concept) = document.concepts.get(code) else {
                continue;
            };
            let resources_only = decomposition
                .iter()
                .all(|child| kinds.get(&child.code) == Some(&ConceptKind::Resource));
            let kind = if concept.marker == CodeMarker::None
                && document.measurements.contains_key(code)
                && resources_only
            {
                ConceptKind::SimpleItem
            } else {
                ConceptKind::Chapter
            };
            kinds.insert(code.clone(), kind);
        }

        for (code, kind) in kinds {
            if let Some(concept) = self.document.concepts.get_mut(&code) {
                concept.kind = kind;
            }
        }
    }

    fn find_roots(&self) -> Vec<Code> {
        let document = &self.document;
        let children = self.children();

        let roots: Vec<Code> = document
            .discovery
            .iter()
            .filter(|code| !children.contains(code))
            .cloned()
            .collect();
        if !roots.is_empty() {
            return roots;
        }

        document
            .discovery
            .iter()
            .filter(|code| {
                document
                    .concepts
                    .get(*code)
                    .is_some_and(|concept| concept.marker == CodeMarker::Root)
            })
            .cloned()
            .collect()
    }
}
