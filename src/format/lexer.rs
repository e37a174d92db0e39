//! Splitting raw BC3 text into records and fields.
//!
//! The lexer is lossless: every field of a record is kept, including empty
//! ones, because the record decoders read fields by position. Subfields are
//! not split here since their layout depends on the record type and on the
//! field position; [`RawRecord::subfields`] splits them on demand.

/// Separates records. A doubled separator is an escaped literal `~`.
pub const RECORD_SEPARATOR: char = '~';

/// Separates the fields of a record.
pub const FIELD_SEPARATOR: char = '|';

/// Separates the subfields of a field.
pub const SUBFIELD_SEPARATOR: char = '\\';

/// One record, split into fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    index: usize,
    fields: Vec<String>,
}

impl RawRecord {
    /// Position of the record among the non-empty records of the input.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// All fields, in order, including empty ones.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The field at `position`, or `""` when the record is shorter.
    #[must_use]
    pub fn field(&self, position: usize) -> &str {
        self.fields.get(position).map_or("", String::as_str)
    }

    /// The subfields of the field at `position`.
    ///
    /// A missing field yields a single empty subfield, like an empty one.
    pub fn subfields(&self, position: usize) -> impl Iterator<Item = &str> {
        self.field(position).split(SUBFIELD_SEPARATOR)
    }

    /// The type marker: the first field, trimmed.
    #[must_use]
    pub fn marker(&self) -> &str {
        self.field(0).trim()
    }

    /// Re-joins the fields into the record text.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.fields.join(&FIELD_SEPARATOR.to_string())
    }
}

/// Splits BC3 text into records.
///
/// Line endings are normalized to `\n`, records are trimmed, and records
/// that are empty or whitespace-only are dropped. Never fails.
#[must_use]
pub fn tokenize(text: &str) -> Vec<RawRecord> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    split_records(&text)
        .iter()
        .map(|record| record.trim())
        .filter(|record| !record.is_empty())
        .enumerate()
        .map(|(index, record)| RawRecord {
            index,
            fields: record.split(FIELD_SEPARATOR).map(str::to_owned).collect(),
        })
        .collect()
}

fn split_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != RECORD_SEPARATOR {
            current.push(c);
        } else if chars.next_if_eq(&RECORD_SEPARATOR).is_some() {
            current.push(RECORD_SEPARATOR);
        } else {
            records.push(std::mem::take(&mut current));
        }
    }
    records.push(current);

    records
}
