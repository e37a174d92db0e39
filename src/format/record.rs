//! Typed BC3 records and their decoders.
//!
//! Every raw record is decoded once into a [`TypedRecord`]. Fields are read
//! by position following the FIEBDC-3 layouts:
//!
//! ```text
//! ~V|OWNER|FORMAT\DATE|PROGRAM|HEADER\LABEL|CHARSET|COMMENT|
//! ~C|CODE{\SYNONYM}|UNIT|SUMMARY|{PRICE\}|{DATE\}|TYPE|
//! ~D|PARENT|{CHILD\FACTOR\YIELD\}|
//! ~M|[PARENT\]CODE|{POSITION\}|TOTAL|{TYPE\COMMENT\UNITS\LENGTH\WIDTH\HEIGHT\}|LABEL|
//! ~T|CODE|TEXT|
//! ```
//!
//! `Y` (append decomposition) and `N` (append measurement) records share the
//! layouts of `D` and `M`. Any other marker decodes to
//! [`TypedRecord::Unknown`].

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    domain::{Code, CodeMarker, DecompositionEntry, MeasurementLine},
    format::{
        lexer::{RawRecord, FIELD_SEPARATOR},
        number::{parse_date, parse_decimal},
    },
};

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedRecord {
    /// File header.
    Version(VersionRecord),
    /// Concept definition.
    Concept(ConceptRecord),
    /// Children of a concept.
    Decomposition(DecompositionRecord),
    /// Measured quantities of a concept.
    Measurement(MeasurementRecord),
    /// Long description of a concept.
    Text(TextRecord),
    /// A record type this crate does not model.
    Unknown {
        /// The record's type marker.
        marker: String,
    },
}

/// Header metadata. Stored, never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct VersionRecord {
    /// Owner of the database.
    pub owner: String,
    /// Format version, e.g. `FIEBDC-3/2020`.
    pub format: String,
    /// Date of the format version.
    pub format_date: String,
    /// Program that wrote the file.
    pub generator: String,
    /// Header title.
    pub header: String,
    /// Declared character set (`ANSI`, `850`, `437`).
    pub charset: String,
    /// Free comment.
    pub comment: String,
}

/// A concept definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRecord {
    /// The concept's code.
    pub code: Code,
    /// Marker the code was written with.
    pub marker: CodeMarker,
    /// Measurement unit.
    pub unit: String,
    /// Short description.
    pub summary: String,
    /// First price, when readable.
    pub price: Option<Decimal>,
    /// First date, when valid.
    pub date: Option<NaiveDate>,
    /// Raw `TYPE` field.
    pub type_code: String,
}

/// Children of a parent concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompositionRecord {
    /// The parent concept.
    pub parent: Code,
    /// Children in record order.
    pub children: Vec<DecompositionEntry>,
    /// Children that were skipped or adjusted while decoding.
    pub issues: Vec<ChildIssue>,
}

/// A problem with one child of an otherwise usable decomposition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChildIssue {
    /// The child has a factor or yield but no code. It is skipped.
    #[error("child {position} of {parent} has no code and was skipped")]
    MissingCode {
        /// The parent concept.
        parent: Code,
        /// One-based position of the child in the record.
        position: usize,
    },

    /// `factor × yield` exceeds the decimal range. The product saturates.
    #[error("factor of {code} under {parent} overflows ({factor} × {performance})")]
    FactorOverflow {
        /// The parent concept.
        parent: Code,
        /// The child concept.
        code: Code,
        /// The declared factor.
        factor: Decimal,
        /// The declared yield.
        performance: Decimal,
    },
}

/// Measurement lines of a concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementRecord {
    /// The measured concept.
    pub code: Code,
    /// The parent the measurement was taken under, when given.
    pub parent: Option<Code>,
    /// The total the writer declared. Only used when there are no lines.
    pub declared_total: Option<Decimal>,
    /// Lines contributing to the quantity.
    ///
    /// When the record has no detail lines but declares a total, the total
    /// becomes a single line.
    pub lines: Vec<MeasurementLine>,
}

/// Long description of a concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    /// The described concept.
    pub code: Code,
    /// Text body.
    pub text: String,
}

/// Errors that make a single record unusable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The record has no type marker.
    #[error("record has no type marker")]
    MissingMarker,

    /// The record has fewer fields than its type needs.
    #[error("{marker} record has {found} fields, expected at least {expected}")]
    TooFewFields {
        /// The record's type marker.
        marker: String,
        /// Minimum field count for the type.
        expected: usize,
        /// Field count found.
        found: usize,
    },

    /// The mandatory code field is empty.
    #[error("{marker} record has no concept code")]
    MissingCode {
        /// The record's type marker.
        marker: String,
    },

    /// A numeric field that must be readable is not.
    #[error("invalid number '{value}' in {field}")]
    InvalidNumber {
        /// Which field held the value.
        field: &'static str,
        /// The offending text.
        value: String,
    },
}

/// Decodes a raw record.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the record cannot be used; callers skip
/// such records and carry on with the next one.
pub fn decode(record: &RawRecord) -> Result<TypedRecord, DecodeError> {
    match record.marker() {
        "" => Err(DecodeError::MissingMarker),
        "V" => decode_version(record).map(TypedRecord::Version),
        "C" => decode_concept(record).map(TypedRecord::Concept),
        "D" | "Y" => decode_decomposition(record).map(TypedRecord::Decomposition),
        "M" | "N" => decode_measurement(record).map(TypedRecord::Measurement),
        "T" => decode_text(record).map(TypedRecord::Text),
        marker => Ok(TypedRecord::Unknown {
            marker: marker.to_owned(),
        }),
    }
}

fn require_fields(record: &RawRecord, expected: usize) -> Result<(), DecodeError> {
    if record.len() < expected {
        return Err(DecodeError::TooFewFields {
            marker: record.marker().to_owned(),
            expected,
            found: record.len(),
        });
    }
    Ok(())
}

fn code_from(record: &RawRecord, raw: &str) -> Result<(Code, CodeMarker), DecodeError> {
    Code::with_marker(raw).map_err(|_| DecodeError::MissingCode {
        marker: record.marker().to_owned(),
    })
}

fn first_subfield(record: &RawRecord, position: usize) -> &str {
    record.subfields(position).next().unwrap_or_default().trim()
}

fn decode_version(record: &RawRecord) -> Result<VersionRecord, DecodeError> {
    require_fields(record, 2)?;

    let mut format = record.subfields(2).map(str::trim);
    let header = first_subfield(record, 4);

    Ok(VersionRecord {
        owner: record.field(1).trim().to_owned(),
        format: format.next().unwrap_or_default().to_owned(),
        format_date: format.next().unwrap_or_default().to_owned(),
        generator: record.field(3).trim().to_owned(),
        header: header.to_owned(),
        charset: record.field(5).trim().to_owned(),
        comment: record.field(6).trim().to_owned(),
    })
}

fn decode_concept(record: &RawRecord) -> Result<ConceptRecord, DecodeError> {
    require_fields(record, 2)?;

    let (code, marker) = code_from(record, first_subfield(record, 1))?;

    let raw_price = first_subfield(record, 4);
    let price = parse_decimal(raw_price);
    if price.is_none() && !raw_price.is_empty() {
        tracing::debug!(%code, raw_price, "unreadable price, using zero");
    }

    Ok(ConceptRecord {
        code,
        marker,
        unit: record.field(2).trim().to_owned(),
        summary: record.field(3).trim().to_owned(),
        price,
        date: parse_date(first_subfield(record, 5)),
        type_code: record.field(6).trim().to_owned(),
    })
}

fn decode_decomposition(record: &RawRecord) -> Result<DecompositionRecord, DecodeError> {
    require_fields(record, 3)?;

    let (parent, _) = code_from(record, record.field(1))?;

    let subfields: Vec<&str> = record.subfields(2).collect();
    let mut children = Vec::new();
    let mut issues = Vec::new();
    for (position, child) in subfields.chunks(3).enumerate() {
        let Ok(code) = Code::new(child[0]) else {
            if child.iter().any(|subfield| !subfield.trim().is_empty()) {
                tracing::debug!(%parent, position = position + 1, "child without code");
                issues.push(ChildIssue::MissingCode {
                    parent: parent.clone(),
                    position: position + 1,
                });
            }
            continue;
        };
        let factor = numeric_or_one(child.get(1));
        let performance = numeric_or_one(child.get(2));
        let product = factor.checked_mul(performance).unwrap_or_else(|| {
            issues.push(ChildIssue::FactorOverflow {
                parent: parent.clone(),
                code: code.clone(),
                factor,
                performance,
            });
            factor.saturating_mul(performance)
        });
        children.push(DecompositionEntry {
            code,
            factor: product,
            record_index: record.index(),
        });
    }

    Ok(DecompositionRecord {
        parent,
        children,
        issues,
    })
}

fn numeric_or_one(raw: Option<&&str>) -> Decimal {
    raw.and_then(|raw| parse_decimal(raw)).unwrap_or(Decimal::ONE)
}

fn decode_measurement(record: &RawRecord) -> Result<MeasurementRecord, DecodeError> {
    require_fields(record, 3)?;

    let codes: Vec<&str> = record
        .subfields(1)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .collect();
    let (code, _) = code_from(record, codes.last().copied().unwrap_or_default())?;
    let parent = match codes.as_slice() {
        [parent, _, ..] => Code::new(parent).ok(),
        _ => None,
    };

    let raw_total = record.field(3).trim();
    let declared_total = if raw_total.is_empty() {
        None
    } else {
        Some(parse_number(raw_total, "measurement total")?)
    };

    let subfields: Vec<&str> = record.subfields(4).collect();
    let mut lines = Vec::new();
    for line in subfields.chunks(6) {
        if line.iter().all(|subfield| subfield.trim().is_empty()) {
            continue;
        }
        // partial and running subtotals repeat quantities already counted
        if matches!(line[0].trim(), "1" | "2") {
            continue;
        }
        let factors = line
            .iter()
            .skip(2)
            .map(|factor| factor.trim())
            .filter(|factor| !factor.is_empty())
            .map(|factor| parse_number(factor, "measurement line"))
            .collect::<Result<Vec<_>, _>>()?;
        lines.push(MeasurementLine {
            comment: line.get(1).map_or("", |comment| comment.trim()).to_owned(),
            factors,
        });
    }

    if lines.is_empty() {
        if let Some(total) = declared_total {
            lines.push(MeasurementLine {
                comment: String::new(),
                factors: vec![total],
            });
        }
    }

    Ok(MeasurementRecord {
        code,
        parent,
        declared_total,
        lines,
    })
}

fn parse_number(raw: &str, field: &'static str) -> Result<Decimal, DecodeError> {
    parse_decimal(raw).ok_or_else(|| DecodeError::InvalidNumber {
        field,
        value: raw.to_owned(),
    })
}

fn decode_text(record: &RawRecord) -> Result<TextRecord, DecodeError> {
    require_fields(record, 3)?;

    let (code, _) = code_from(record, record.field(1))?;

    let mut body = &record.fields()[2..];
    while let [rest @ .., last] = body {
        if !last.trim().is_empty() {
            break;
        }
        body = rest;
    }

    Ok(TextRecord {
        code,
        text: body.join(&FIELD_SEPARATOR.to_string()),
    })
}
