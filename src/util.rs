// Utility helpers for label normalization and forgiving number parsing.
//
// This module centralizes the "dirty" spreadsheet/store value handling so the
// rest of the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Canonical form of an area or month label: trimmed and upper-cased.
///
/// Applied at the store boundary and again by the reconciler; applying it
/// twice gives the same result as applying it once.
pub fn normalize_label(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Canonical form of an imported column header.
///
/// - Trims and lower-cases.
/// - Drops parentheses, so `Janeiro (Em Dia)` reads as `janeiro em dia`.
/// - Collapses runs of whitespace to a single space.
pub fn normalize_header(s: &str) -> String {
    s.to_lowercase()
        .replace(['(', ')'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Coerce a float cell into a count.
///
/// Non-finite and negative values become 0; fractions truncate.
pub fn count_from_f64(v: f64) -> u32 {
    if !v.is_finite() || v <= 0.0 {
        return 0;
    }
    if v >= u32::MAX as f64 {
        return u32::MAX;
    }
    v.trunc() as u32
}

/// Parse a text cell into a count, falling back to 0.
///
/// Accepts `"12"`, `" 12 "`, `"12.0"` and `"12,0"`; anything else is 0.
pub fn parse_count_safe(s: Option<&str>) -> u32 {
    let Some(s) = s.map(str::trim) else {
        return 0;
    };
    if s.is_empty() {
        return 0;
    }
    if let Ok(v) = s.parse::<u32>() {
        return v;
    }
    s.replace(',', ".").parse::<f64>().map(count_from_f64).unwrap_or(0)
}

pub fn compliance_pct(on_time: u64, overdue: u64) -> f64 {
    let total = on_time + overdue;
    if total == 0 {
        return 0.0;
    }
    on_time as f64 / total as f64 * 100.0
}

pub fn format_pct(v: f64) -> String {
    // Brazilian convention: comma as decimal separator.
    format!("{:.1}", v).replace('.', ",")
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::pt)
}
