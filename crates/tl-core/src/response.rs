//! Columnar responses and defensive scalar extraction.
//!
//! Nothing in this module fails: missing columns, short rows, nulls and
//! unparsable values all collapse to a default.

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Query result as a shared field list plus row-major cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnarResponse {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl ColumnarResponse {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds a lookup table over this response's fields.
    pub fn field_index(&self) -> FieldIndex {
        FieldIndex::new(&self.fields)
    }
}

/// A single cell value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Arrays and objects are not expected but must not fail decoding.
    Other(serde_json::Value),
}

impl Cell {
    /// String form of the cell; null becomes empty.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Bool(value) => Cow::Owned(value.to_string()),
            Self::Number(value) => Cow::Owned(format_number(*value)),
            Self::Text(value) => Cow::Borrowed(value),
            Self::Other(value) => Cow::Owned(value.to_string()),
        }
    }

    /// Permissive numeric value; anything non-numeric is `0.0`.
    pub fn number(&self) -> f64 {
        match self {
            Self::Number(value) if value.is_finite() => *value,
            Self::Text(value) => parse_number(value),
            _ => 0.0,
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Cell {
    #[expect(
        clippy::cast_precision_loss,
        reason = "cells mirror JSON numbers, which are f64"
    )]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "only integral values well inside i64 range are cast"
)]
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// Case-insensitive field name to column position table.
///
/// Built once per response; the first occurrence of a name wins.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FieldIndex {
    pub fn new(fields: &[String]) -> Self {
        let names: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
        let mut positions = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            positions.entry(name.clone()).or_insert(position);
        }
        Self { names, positions }
    }

    /// Position of the first candidate name present in the response.
    pub fn position(&self, candidates: &[&str]) -> Option<usize> {
        candidates
            .iter()
            .find_map(|name| self.positions.get(&name.to_lowercase()).copied())
    }

    /// Position of an exact candidate, else of the first field containing
    /// `needle` (e.g. a dotted attribute path such as `resource.os.name`).
    pub fn position_or_containing(&self, candidates: &[&str], needle: &str) -> Option<usize> {
        self.position(candidates)
            .or_else(|| self.names.iter().position(|name| name.contains(needle)))
    }
}

/// Borrowed view over one response row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    pub const fn new(cells: &'a [Cell]) -> Self {
        Self { cells }
    }

    /// Cell at a resolved position; missing columns and short rows are null.
    pub fn cell(&self, position: Option<usize>) -> &'a Cell {
        static NULL: Cell = Cell::Null;
        position
            .and_then(|position| self.cells.get(position))
            .unwrap_or(&NULL)
    }

    pub fn text(&self, position: Option<usize>) -> Cow<'a, str> {
        self.cell(position).text()
    }

    /// Trimmed text, `None` when empty or whitespace-only.
    pub fn non_blank(&self, position: Option<usize>) -> Option<String> {
        let text = self.text(position);
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn number(&self, position: Option<usize>) -> f64 {
        self.cell(position).number()
    }

    /// Epoch milliseconds, `None` when absent or unparsable.
    pub fn timestamp_ms(&self, position: Option<usize>) -> Option<i64> {
        match self.cell(position) {
            Cell::Null => None,
            cell => parse_timestamp_ms(&cell.text()),
        }
    }
}

/// Parse a leading decimal number, ignoring trailing garbage.
///
/// `"12.5ms"` is `12.5`; `"abc"`, `""`, and non-finite values are `0.0`.
pub fn parse_number(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a store timestamp to epoch milliseconds.
///
/// Accepts RFC 3339, naive date-times (taken as UTC), and bare epoch
/// milliseconds. Instants at or before the epoch count as unset.
pub fn parse_timestamp_ms(input: &str) -> Option<i64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let millis = if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        dt.timestamp_millis()
    } else if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
    {
        naive.and_utc().timestamp_millis()
    } else if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse::<i64>().ok()?
    } else {
        return None;
    };

    (millis > 0).then_some(millis)
}
