//! Decoding of span events and links from their flattened column form.
//!
//! Trace queries flatten the nested `Events.*` and `Links.*` arrays into
//! delimited strings: scalar lists are comma-separated and attribute maps are
//! pipe-separated map literals such as `{'k':'v','k2':'v2'}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::response::parse_timestamp_ms;

/// A timestamped event recorded on a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEvent {
    /// Epoch milliseconds, `0` when unparsable.
    pub timestamp: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// A link from a span to another span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanLink {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_state: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

fn split_list(input: &str, separator: char) -> Vec<&str> {
    input.split(separator).filter(|s| !s.is_empty()).collect()
}

/// Decode span events. Missing timestamps or names yield no events.
pub fn parse_span_events(timestamps: &str, names: &str, attributes: &str) -> Vec<SpanEvent> {
    if timestamps.is_empty() || names.is_empty() {
        return Vec::new();
    }
    let names = split_list(names, ',');
    let attributes = split_list(attributes, '|');

    split_list(timestamps, ',')
        .into_iter()
        .enumerate()
        .map(|(index, timestamp)| SpanEvent {
            timestamp: parse_timestamp_ms(timestamp).unwrap_or(0),
            name: names.get(index).map_or_else(String::new, |n| n.trim().to_string()),
            attributes: attributes
                .get(index)
                .map(|a| parse_map_literal(a))
                .unwrap_or_default(),
        })
        .collect()
}

/// Decode span links. Missing trace or span ids yield no links.
pub fn parse_span_links(
    trace_ids: &str,
    span_ids: &str,
    trace_states: &str,
    attributes: &str,
) -> Vec<SpanLink> {
    if trace_ids.is_empty() || span_ids.is_empty() {
        return Vec::new();
    }
    let span_ids = split_list(span_ids, ',');
    let trace_states = split_list(trace_states, ',');
    let attributes = split_list(attributes, '|');

    split_list(trace_ids, ',')
        .into_iter()
        .enumerate()
        .map(|(index, trace_id)| SpanLink {
            trace_id: trace_id.trim().to_string(),
            span_id: span_ids
                .get(index)
                .map_or_else(String::new, |s| s.trim().to_string()),
            trace_state: trace_states
                .get(index)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from),
            attributes: attributes
                .get(index)
                .map(|a| parse_map_literal(a))
                .unwrap_or_default(),
        })
        .collect()
}

/// Parse a `{'key':'value',...}` map literal; malformed input is empty.
pub fn parse_map_literal(input: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let Some(content) = input
        .trim()
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return map;
    };

    for pair in content.split("','") {
        let Some(colon) = pair.find("':") else {
            continue;
        };
        if colon == 0 {
            continue;
        }
        let key = pair[..colon].trim_matches('\'');
        let value = pair[colon + 2..].trim_matches('\'');
        if !key.is_empty() {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}
