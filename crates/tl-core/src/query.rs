//! Wire model for columnar data query requests.
//!
//! A [`QueryRequest`] is a store-agnostic description of what to select,
//! how to filter it, and how to order it. The store executes it and replies
//! with a [`ColumnarResponse`](crate::response::ColumnarResponse) whose
//! `fields` are the aliases declared in `select`.

use std::collections::{BTreeMap, HashSet};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while shaping a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Two select items share an alias, so the response column is ambiguous.
    #[error("duplicate select alias: {alias}")]
    DuplicateAlias { alias: String },

    /// A select item has no alias and cannot be located in the response.
    #[error("select item {index} has an empty alias")]
    EmptyAlias { index: usize },

    /// A time range bound could not be parsed.
    #[error("invalid timestamp: {value}")]
    InvalidTimestamp { value: String },

    /// The time range ends before it starts.
    #[error("time range end {end} is before start {start}")]
    InvertedTimeRange { start: String, end: String },
}

/// Record family to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Traces,
    Logs,
    Exceptions,
}

/// Time window for a query, as UTC ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    /// Creates a range from two UTC instants.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, QueryError> {
        if end < start {
            return Err(QueryError::InvertedTimeRange {
                start: format_instant(start),
                end: format_instant(end),
            });
        }
        Ok(Self {
            start: format_instant(start),
            end: format_instant(end),
        })
    }

    /// Normalizes caller-supplied bounds to UTC.
    ///
    /// Accepts RFC 3339 instants (any offset) or naive
    /// `YYYY-MM-DD HH:MM:SS` strings, which are taken as UTC.
    pub fn normalized(start: &str, end: &str) -> Result<Self, QueryError> {
        Self::new(parse_bound(start)?, parse_bound(end)?)
    }
}

fn parse_bound(value: &str) -> Result<DateTime<Utc>, QueryError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| QueryError::InvalidTimestamp {
            value: value.to_string(),
        })
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Projection function for a select item.
///
/// The store owns this vocabulary; anything beyond the structural functions
/// is passed through verbatim as [`SelectFunction::Named`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectFunction {
    /// Raw column, `param.field`.
    Col,
    /// Raw store expression, `param.expression`.
    Custom,
    /// Bucketed timestamp, `param.bucket` and `param.field`.
    TimeBucket,
    /// Store-defined aggregate such as `APDEX` or `DURATION_P95`.
    Named(String),
}

impl fmt::Display for SelectFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Col => f.write_str("COL"),
            Self::Custom => f.write_str("CUSTOM"),
            Self::TimeBucket => f.write_str("TIME_BUCKET"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl FromStr for SelectFunction {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "COL" => Self::Col,
            "CUSTOM" => Self::Custom,
            "TIME_BUCKET" => Self::TimeBucket,
            other => Self::Named(other.to_string()),
        })
    }
}

impl Serialize for SelectFunction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SelectFunction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let Ok(function) = s.parse::<SelectFunction>();
        Ok(function)
    }
}

/// One projection in a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectItem {
    pub function: SelectFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<BTreeMap<String, String>>,
    pub alias: String,
}

impl SelectItem {
    /// Selects a raw column.
    pub fn col(field: &str, alias: &str) -> Self {
        Self::with_params(SelectFunction::Col, &[("field", field)], alias)
    }

    /// Selects a raw store expression.
    pub fn custom(expression: &str, alias: &str) -> Self {
        Self::with_params(SelectFunction::Custom, &[("expression", expression)], alias)
    }

    /// Selects a bucketed timestamp.
    pub fn time_bucket(bucket: &str, field: &str, alias: &str) -> Self {
        Self::with_params(
            SelectFunction::TimeBucket,
            &[("bucket", bucket), ("field", field)],
            alias,
        )
    }

    /// Selects a store-defined aggregate without parameters.
    pub fn aggregate(name: &str, alias: &str) -> Self {
        Self {
            function: SelectFunction::Named(name.to_string()),
            param: None,
            alias: alias.to_string(),
        }
    }

    fn with_params(function: SelectFunction, params: &[(&str, &str)], alias: &str) -> Self {
        let param = params
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Self {
            function,
            param: Some(param),
            alias: alias.to_string(),
        }
    }
}

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterOperator {
    Eq,
    In,
    Like,
    /// Raw boolean expression in `value[0]`; `field` is ignored.
    Additional,
}

/// One predicate in a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Vec<String>,
}

impl Filter {
    pub fn eq(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: FilterOperator::Eq,
            value: vec![value.to_string()],
        }
    }

    pub fn in_list<I, S>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.to_string(),
            operator: FilterOperator::In,
            value: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn like(field: &str, pattern: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: FilterOperator::Like,
            value: vec![pattern.to_string()],
        }
    }

    /// A raw expression filter. Callers must escape any interpolated values.
    pub fn additional(expression: String) -> Self {
        Self {
            field: String::new(),
            operator: FilterOperator::Additional,
            value: vec![expression],
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Asc,
        }
    }
}

/// A columnar data query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub data_type: DataType,
    pub time_range: TimeRange,
    pub select: Vec<SelectItem>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<OrderBy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl QueryRequest {
    /// Returns the select aliases in projection order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.select.iter().map(|item| item.alias.as_str())
    }

    /// Checks that every select alias is non-empty and unique.
    pub fn validate(&self) -> Result<(), QueryError> {
        let mut seen = HashSet::new();
        for (index, alias) in self.aliases().enumerate() {
            if alias.is_empty() {
                return Err(QueryError::EmptyAlias { index });
            }
            if !seen.insert(alias) {
                return Err(QueryError::DuplicateAlias {
                    alias: alias.to_string(),
                });
            }
        }
        Ok(())
    }
}
