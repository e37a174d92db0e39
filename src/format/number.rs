use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Parses a decimal number.
///
/// Dot decimals (`12.50`) are the format's default. A value containing a
/// comma is read as a Spanish-locale number, where dots group thousands
/// (`1.234,5`). Scientific notation is accepted. Returns `None` for empty or
/// unreadable input.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed
    };

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Parses a `DDMMYY` or `DDMMYYYY` date.
///
/// Shorter values are left-padded with zeros, as the format allows leading
/// zeros to be omitted. Two-digit years below 80 are in the 2000s.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let padded = match raw.len() {
        5 | 6 => format!("{raw:0>6}"),
        7 | 8 => format!("{raw:0>8}"),
        _ => return None,
    };

    let day = padded[0..2].parse().ok()?;
    let month = padded[2..4].parse().ok()?;
    let year: i32 = padded[4..].parse().ok()?;
    let year = match padded.len() {
        6 if year < 80 => 2000 + year,
        6 => 1900 + year,
        _ => year,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}
