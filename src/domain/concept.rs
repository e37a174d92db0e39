use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Code, CodeMarker};

/// How a concept takes part in the budget.
///
/// Derived from the concept's position in the decomposition graph once the
/// whole document has been read. It only affects labelling, never the
/// arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptKind {
    /// A grouping concept that is broken down into other concepts.
    Chapter,
    /// A measured line item ("partida").
    SimpleItem,
    /// A priced input (labour, machinery, material) used by other concepts.
    Resource,
    /// None of the above.
    #[default]
    Unclassified,
}

/// The resource class carried in the `TYPE` field of a concept record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Type `1`.
    Labour,
    /// Type `2`.
    Machinery,
    /// Type `3`.
    Material,
}

impl ResourceClass {
    /// Reads the class from a raw `TYPE` field.
    #[must_use]
    pub fn from_type_code(type_code: &str) -> Option<Self> {
        match type_code.trim() {
            "1" => Some(Self::Labour),
            "2" => Some(Self::Machinery),
            "3" => Some(Self::Material),
            _ => None,
        }
    }
}

/// A priced, described item of the budget database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Concept {
    pub(crate) code: Code,
    pub(crate) marker: CodeMarker,
    pub(crate) unit: String,
    pub(crate) summary: String,
    pub(crate) price: Option<Decimal>,
    pub(crate) date: Option<NaiveDate>,
    pub(crate) type_code: String,
    pub(crate) kind: ConceptKind,
    pub(crate) record_index: usize,
}

impl Concept {
    /// The concept's code.
    #[must_use]
    pub const fn code(&self) -> &Code {
        &self.code
    }

    /// The marker the code was written with.
    #[must_use]
    pub const fn marker(&self) -> CodeMarker {
        self.marker
    }

    /// Measurement unit, possibly empty.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Short description ("resumen").
    #[must_use]
    pub fn description(&self) -> &str {
        &self.summary
    }

    /// Unit price, zero when the record carried none or an unreadable one.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.price.unwrap_or_default()
    }

    /// Whether the record carried a readable price.
    #[must_use]
    pub const fn is_priced(&self) -> bool {
        self.price.is_some()
    }

    /// Date of the price, when present and valid.
    #[must_use]
    pub const fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Resource class from the explicit `TYPE` field, if any.
    #[must_use]
    pub fn resource_class(&self) -> Option<ResourceClass> {
        ResourceClass::from_type_code(&self.type_code)
    }

    /// Classification computed when the document was built.
    #[must_use]
    pub const fn kind(&self) -> ConceptKind {
        self.kind
    }

    /// Index of the record that last defined this concept.
    #[must_use]
    pub const fn record_index(&self) -> usize {
        self.record_index
    }
}

/// One child of a decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecompositionEntry {
    /// The child concept.
    pub code: Code,
    /// Quantity of the child per unit of the parent (factor × yield).
    pub factor: Decimal,
    /// Index of the record that declared the child.
    pub record_index: usize,
}

/// One line of a measurement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MeasurementLine {
    /// Free-text comment, possibly empty.
    pub comment: String,
    /// Units, length, width, height: whichever were given.
    pub factors: Vec<Decimal>,
}

impl MeasurementLine {
    /// Product of the factors, or zero for a line without any.
    ///
    /// Saturates at the decimal range; see [`Self::checked_quantity`].
    #[must_use]
    pub fn quantity(&self) -> Decimal {
        self.checked_quantity().unwrap_or_else(|| {
            self.factors
                .iter()
                .fold(Decimal::ONE, |product, factor| product.saturating_mul(*factor))
        })
    }

    /// Product of the factors, or `None` if it exceeds the decimal range.
    #[must_use]
    pub fn checked_quantity(&self) -> Option<Decimal> {
        if self.factors.is_empty() {
            return Some(Decimal::ZERO);
        }
        self.factors
            .iter()
            .try_fold(Decimal::ONE, |product, factor| product.checked_mul(*factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_quantity_is_product_of_factors() {
        let line = MeasurementLine {
            comment: "north wall".into(),
            factors: vec![Decimal::from(2), Decimal::new(35, 1), Decimal::new(25, 1)],
        };
        assert_eq!(line.quantity(), Decimal::new(175, 1));
    }

    #[test]
    fn line_without_factors_is_zero() {
        assert_eq!(MeasurementLine::default().quantity(), Decimal::ZERO);
    }

    #[test]
    fn oversized_line_saturates_unless_checked() {
        let line = MeasurementLine {
            comment: String::new(),
            factors: vec![Decimal::MAX, Decimal::TWO],
        };
        assert_eq!(line.checked_quantity(), None);
        assert_eq!(line.quantity(), Decimal::MAX);
    }

    #[test]
    fn resource_class_reads_type_codes() {
        assert_eq!(ResourceClass::from_type_code("1"), Some(ResourceClass::Labour));
        assert_eq!(ResourceClass::from_type_code(" 3 "), Some(ResourceClass::Material));
        assert_eq!(ResourceClass::from_type_code("0"), None);
        assert_eq!(ResourceClass::from_type_code(""), None);
    }
}
