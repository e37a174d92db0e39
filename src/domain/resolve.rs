//! Flattening the decomposition graph into budget line items.
//!
//! Resolution walks the graph depth-first from each root, multiplying the
//! decomposition factors along the path. The walk is iterative: an owned
//! stack of [`Step`]s replaces recursion and a set of the codes on the active
//! path turns cycle detection into a membership check.

use std::{collections::HashSet, fmt};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::instrument;

use crate::domain::{Code, Concept, ConceptKind, Config, Diagnostic, DiagnosticSummary, Document};

/// Description given to placeholder items for dangling references.
pub const UNRESOLVED_DESCRIPTION: &str = "unresolved reference";

/// Default limit on the number of line items one resolution may produce.
///
/// Shared subtrees are emitted once per path, so a small file whose layers
/// each reference the next one twice expands exponentially.
pub const DEFAULT_MAX_ITEMS: usize = 100_000;

/// Settings for [`resolve_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Decimal places extended totals are rounded to.
    pub decimals: u32,
    /// Description of placeholder items.
    pub placeholder_description: String,
    /// Resolution stops once this many items have been produced.
    pub max_items: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            decimals: 2,
            placeholder_description: UNRESOLVED_DESCRIPTION.to_owned(),
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl From<&Config> for ResolveOptions {
    fn from(config: &Config) -> Self {
        Self {
            decimals: config.decimals(),
            placeholder_description: config.placeholder_description.clone(),
            max_items: config.max_items,
        }
    }
}

/// One concept's contribution to the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLineItem {
    /// The concept's code.
    pub code: Code,
    /// Long text when the concept has one, its short description otherwise.
    pub description: String,
    /// Measurement unit.
    pub unit: String,
    /// Unit price.
    pub unit_price: Decimal,
    /// Measured quantity multiplied by every factor on the path from the root.
    pub resolved_quantity: Decimal,
    /// `unit_price × resolved_quantity`, rounded to the configured decimals.
    pub extended_total: Decimal,
    /// Number of ancestors.
    pub depth: usize,
    /// Codes of the ancestors, root first.
    pub ancestor_chain: Vec<Code>,
    /// The concept's classification.
    pub kind: ConceptKind,
    /// Whether the item groups the items that follow it.
    pub is_header: bool,
    /// Whether the item stands in for a code with no concept record.
    pub unresolved: bool,
}

/// The output of resolution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    items: Vec<ResolvedLineItem>,
    diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// Line items in traversal order.
    #[must_use]
    pub fn items(&self) -> &[ResolvedLineItem] {
        &self.items
    }

    /// Consumes the resolution, returning the line items.
    #[must_use]
    pub fn into_items(self) -> Vec<ResolvedLineItem> {
        self.items
    }

    /// Problems found while parsing, followed by those found while resolving.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostic counts per kind.
    #[must_use]
    pub fn diagnostic_summary(&self) -> DiagnosticSummary {
        DiagnosticSummary::from_diagnostics(&self.diagnostics)
    }

    /// Sum of the extended totals of the leaf items.
    ///
    /// Headers are left out so that no amount is counted twice.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .filter(|item| !item.is_header)
            .fold(Decimal::ZERO, |total, item| {
                total.saturating_add(item.extended_total)
            })
    }
}

/// Why a document cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// No concept was decoded.
    NoConcepts,
    /// Every concept is referenced as a child and none is marked as root.
    NoRoots,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoConcepts => "no concepts were decoded",
            Self::NoRoots => "no root concept was found",
        })
    }
}

/// Errors that make resolution meaningless.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    /// There is nothing to resolve.
    #[error("empty document: {0}")]
    EmptyDocument(EmptyReason),
}

/// Resolves a document with the default options.
///
/// # Errors
///
/// Returns [`ResolveError::EmptyDocument`] if the document has no concepts
/// or no roots.
pub fn resolve(document: &Document) -> Result<Resolution, ResolveError> {
    resolve_with(document, &ResolveOptions::default())
}

/// Resolves a document from its roots.
///
/// # Errors
///
/// Returns [`ResolveError::EmptyDocument`] if the document has no concepts
/// or no roots.
pub fn resolve_with(
    document: &Document,
    options: &ResolveOptions,
) -> Result<Resolution, ResolveError> {
    resolve_from(document, document.roots(), options)
}

/// Resolves a document starting from the given codes, in order.
///
/// # Errors
///
/// Returns [`ResolveError::EmptyDocument`] if the document has no concepts
/// or `roots` is empty.
#[instrument(level = "debug", skip_all, fields(roots = roots.len()))]
pub fn resolve_from(
    document: &Document,
    roots: &[Code],
    options: &ResolveOptions,
) -> Result<Resolution, ResolveError> {
    if document.is_empty() {
        return Err(ResolveError::EmptyDocument(EmptyReason::NoConcepts));
    }
    if roots.is_empty() {
        return Err(ResolveError::EmptyDocument(EmptyReason::NoRoots));
    }

    let mut resolver = Resolver {
        document,
        options,
        items: Vec::new(),
        diagnostics: document.diagnostics().to_vec(),
        truncated: false,
    };
    for root in roots {
        if resolver.truncated {
            break;
        }
        resolver.walk(root);
    }

    tracing::debug!(
        items = resolver.items.len(),
        diagnostics = resolver.diagnostics.len(),
        "document resolved"
    );

    Ok(Resolution {
        items: resolver.items,
        diagnostics: resolver.diagnostics,
    })
}

/// A concept waiting to be visited.
struct Frame {
    code: Code,
    /// Product of the factors on the path from the root.
    factor: Decimal,
    ancestors: Vec<Code>,
    /// The record that placed the concept under its parent.
    record_index: Option<usize>,
}

enum Step {
    Enter(Frame),
    /// All children of the code have been visited.
    Leave(Code),
}

struct Resolver<'a> {
    document: &'a Document,
    options: &'a ResolveOptions,
    items: Vec<ResolvedLineItem>,
    diagnostics: Vec<Diagnostic>,
    truncated: bool,
}

impl Resolver<'_> {
    fn walk(&mut self, root: &Code) {
        let document = self.document;
        let mut on_path: HashSet<Code> = HashSet::new();
        let mut stack = vec![Step::Enter(Frame {
            code: root.clone(),
            factor: Decimal::ONE,
            ancestors: Vec::new(),
            record_index: None,
        })];

        while let Some(step) = stack.pop() {
            let frame = match step {
                Step::Enter(frame) => frame,
                Step::Leave(code) => {
                    on_path.remove(&code);
                    continue;
                }
            };

            if on_path.contains(&frame.code) {
                self.report_cycle(&frame);
                continue;
            }

            if self.items.len() >= self.options.max_items {
                self.report_truncated();
                return;
            }

            let Some(concept) = document.concept(&frame.code) else {
                self.report_dangling(&frame);
                let item = self.placeholder(frame);
                self.items.push(item);
                continue;
            };

            let parent = frame.ancestors.last().map(Code::as_str);
            let measured = document.measured_quantity_under(parent, &frame.code);
            let Some(children) = document.decomposition(&frame.code) else {
                let item = self.item(concept, &frame, measured.unwrap_or(Decimal::ZERO), false);
                self.items.push(item);
                continue;
            };

            // A decomposed concept may carry its own measurement ("3 units of
            // this assembly"); without one it counts once.
            let item = self.item(concept, &frame, measured.unwrap_or(Decimal::ONE), true);
            self.items.push(item);

            on_path.insert(frame.code.clone());
            stack.push(Step::Leave(frame.code.clone()));

            let mut ancestors = frame.ancestors;
            ancestors.push(frame.code);
            for child in children.iter().rev() {
                stack.push(Step::Enter(Frame {
                    code: child.code.clone(),
                    factor: self.multiply(frame.factor, child.factor, &child.code),
                    ancestors: ancestors.clone(),
                    record_index: Some(child.record_index),
                }));
            }
        }
    }

    fn item(
        &mut self,
        concept: &Concept,
        frame: &Frame,
        measured: Decimal,
        is_header: bool,
    ) -> ResolvedLineItem {
        let resolved_quantity = self.multiply(frame.factor, measured, &frame.code);
        let unit_price = concept.unit_price();
        let extended_total = self
            .multiply(unit_price, resolved_quantity, &frame.code)
            .round_dp_with_strategy(self.options.decimals, RoundingStrategy::MidpointAwayFromZero);

        let description = self
            .document
            .text(&frame.code)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| concept.description());

        ResolvedLineItem {
            code: frame.code.clone(),
            description: description.to_owned(),
            unit: concept.unit().to_owned(),
            unit_price,
            resolved_quantity,
            extended_total,
            depth: frame.ancestors.len(),
            ancestor_chain: frame.ancestors.clone(),
            kind: concept.kind(),
            is_header,
            unresolved: false,
        }
    }

    fn placeholder(&self, frame: Frame) -> ResolvedLineItem {
        ResolvedLineItem {
            code: frame.code,
            description: self.options.placeholder_description.clone(),
            unit: String::new(),
            unit_price: Decimal::ZERO,
            resolved_quantity: Decimal::ZERO,
            extended_total: Decimal::ZERO,
            depth: frame.ancestors.len(),
            ancestor_chain: frame.ancestors,
            kind: ConceptKind::Unclassified,
            is_header: false,
            unresolved: true,
        }
    }

    /// Multiplies, saturating on overflow and reporting it.
    fn multiply(&mut self, left: Decimal, right: Decimal, code: &Code) -> Decimal {
        left.checked_mul(right).unwrap_or_else(|| {
            tracing::warn!(%code, "quantity overflow");
            self.diagnostics.push(Diagnostic::overflow(
                None,
                format!("quantity of {code} overflows ({left} × {right})"),
            ));
            left.saturating_mul(right)
        })
    }

    fn report_cycle(&mut self, frame: &Frame) {
        let path = frame
            .ancestors
            .iter()
            .map(Code::as_str)
            .chain(std::iter::once(frame.code.as_str()))
            .collect::<Vec<_>>()
            .join(" -> ");
        tracing::warn!(code = %frame.code, %path, "decomposition cycle");
        self.diagnostics.push(Diagnostic::cycle(
            frame.record_index,
            format!("cycle {path}: edge to {} not followed", frame.code),
        ));
    }

    fn report_dangling(&mut self, frame: &Frame) {
        let message = match frame.ancestors.last() {
            Some(parent) => format!("{parent} references {} which has no concept record", frame.code),
            None => format!("{} has no concept record", frame.code),
        };
        tracing::warn!(code = %frame.code, "dangling reference");
        self.diagnostics
            .push(Diagnostic::dangling(frame.record_index, message));
    }

    fn report_truncated(&mut self) {
        let limit = self.options.max_items;
        tracing::warn!(limit, "item limit reached, stopping resolution");
        self.diagnostics.push(Diagnostic::truncated(format!(
            "resolution stopped after {limit} items"
        )));
        self.truncated = true;
    }
}
