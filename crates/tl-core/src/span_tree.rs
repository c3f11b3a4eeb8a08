//! Span trees: a session's spans, logs and exceptions merged into
//! per-trace parent/child hierarchies.
//!
//! Spans nest under the span named by their parent id within the same
//! trace. Logs and exceptions hang off the span whose id they carry. Records
//! that cannot be placed stand at the root; a dangling span or log reference
//! marks the record as an orphan.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::builder::alias;
use crate::response::{ColumnarResponse, Row};

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Log names are the body cut to this many characters.
const LOG_NAME_CHARS: usize = 50;

/// Role of a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Span,
    Log,
    Exception,
    /// A span whose parent is not among the trace's spans.
    OrphanSpan,
    /// A log whose span was not fetched.
    OrphanLog,
}

impl NodeKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Span => "span",
            Self::Log => "log",
            Self::Exception => "exception",
            Self::OrphanSpan => "orphan-span",
            Self::OrphanLog => "orphan-log",
        }
    }

    pub const fn is_orphan(&self) -> bool {
        matches!(self, Self::OrphanSpan | Self::OrphanLog)
    }

    const fn orphaned(self) -> Self {
        match self {
            Self::Span => Self::OrphanSpan,
            Self::Log => Self::OrphanLog,
            other => other,
        }
    }
}

/// One record in the tree, with the records nested beneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Milliseconds since the session's earliest record.
    pub start: i64,
    /// Milliseconds; zero for logs and exceptions.
    pub duration: f64,
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Ordered by start time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// All records of a session arranged as a forest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanTree {
    /// Epoch milliseconds of the earliest timestamped record.
    #[serde(default)]
    pub session_start: Option<i64>,
    /// Milliseconds from the session start to the latest record end.
    pub session_duration: f64,
    /// Levels in the deepest branch; zero for an empty tree.
    pub depth: usize,
    /// Ordered by start time.
    pub roots: Vec<TreeNode>,
}

impl SpanTree {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Orphaned records. Orphans are always roots.
    pub fn orphans(&self) -> impl Iterator<Item = &TreeNode> {
        self.roots.iter().filter(|node| node.kind.is_orphan())
    }
}

struct Record {
    node: TreeNode,
    absolute: Option<i64>,
}

enum Placement {
    Child(usize),
    Root,
    Orphan,
}

/// Merge the three record families of a session into a [`SpanTree`].
///
/// Exceptions are optional since their fetch is best-effort.
pub fn build_span_tree(
    traces: &ColumnarResponse,
    logs: &ColumnarResponse,
    exceptions: Option<&ColumnarResponse>,
) -> SpanTree {
    let mut records = span_records(traces);
    let span_count = records.len();
    records.extend(log_records(logs));
    records.extend(exceptions.map(exception_records).unwrap_or_default());
    if records.is_empty() {
        return SpanTree::default();
    }

    let session_start = records.iter().filter_map(|record| record.absolute).min();
    for record in &mut records {
        record.node.start = match (record.absolute, session_start) {
            (Some(absolute), Some(start)) => absolute - start,
            _ => 0,
        };
    }
    let session_duration = records
        .iter()
        .map(|record| end_ms(&record.node))
        .fold(0.0, f64::max);

    let placements = place(&records, span_count);
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut root_indices = Vec::new();
    for (index, placement) in placements.into_iter().enumerate() {
        match placement {
            Placement::Child(parent) => children[parent].push(index),
            Placement::Root => root_indices.push(index),
            Placement::Orphan => {
                records[index].node.kind = records[index].node.kind.orphaned();
                root_indices.push(index);
            }
        }
    }

    let mut slots: Vec<Option<TreeNode>> = records.into_iter().map(|r| Some(r.node)).collect();
    let mut roots: Vec<TreeNode> = root_indices
        .into_iter()
        .filter_map(|index| materialize(index, &mut slots, &children))
        .collect();

    // Whatever is left sits on a parent cycle and is unreachable from a root.
    while let Some(index) = slots.iter().position(Option::is_some) {
        if let Some(mut node) = materialize(index, &mut slots, &children) {
            tracing::debug!(id = %node.id, "span parent chain forms a cycle");
            node.kind = node.kind.orphaned();
            roots.push(node);
        }
    }
    roots.sort_by_key(|node| node.start);

    let tree = SpanTree {
        session_start,
        session_duration,
        depth: depth(&roots),
        roots,
    };
    tracing::debug!(
        roots = tree.roots.len(),
        depth = tree.depth,
        orphans = tree.orphans().count(),
        "built span tree"
    );
    tree
}

/// Decide where each record goes. Spans occupy `records[..span_count]`.
fn place(records: &[Record], span_count: usize) -> Vec<Placement> {
    let spans = &records[..span_count];
    let mut by_trace: HashMap<(&str, &str), usize> = HashMap::with_capacity(span_count);
    let mut by_span: HashMap<&str, usize> = HashMap::with_capacity(span_count);
    for (index, record) in spans.iter().enumerate() {
        let node = &record.node;
        by_trace
            .entry((node.trace_id.as_str(), node.span_id.as_str()))
            .or_insert(index);
        if !node.span_id.is_empty() {
            by_span.entry(node.span_id.as_str()).or_insert(index);
        }
    }

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let node = &record.node;
            if index < span_count {
                return match &node.parent_span_id {
                    None => Placement::Root,
                    Some(parent) => by_trace
                        .get(&(node.trace_id.as_str(), parent.as_str()))
                        .copied()
                        .filter(|&found| found != index)
                        .map_or(Placement::Orphan, Placement::Child),
                };
            }
            match by_span.get(node.span_id.as_str()) {
                Some(&span) => Placement::Child(span),
                _ if node.kind == NodeKind::Log => Placement::Orphan,
                _ => Placement::Root,
            }
        })
        .collect()
}

/// Move a node and its reachable descendants out of `slots`.
fn materialize(
    index: usize,
    slots: &mut [Option<TreeNode>],
    children: &[Vec<usize>],
) -> Option<TreeNode> {
    let mut node = slots.get_mut(index)?.take()?;
    let mut nested = Vec::with_capacity(children[index].len());
    for &child in &children[index] {
        if let Some(child) = materialize(child, slots, children) {
            nested.push(child);
        }
    }
    nested.sort_by_key(|child| child.start);
    node.children = nested;
    Some(node)
}

fn depth(nodes: &[TreeNode]) -> usize {
    nodes
        .iter()
        .map(|node| 1 + depth(&node.children))
        .max()
        .unwrap_or(0)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "relative offsets stay far below 2^52 ms"
)]
fn end_ms(node: &TreeNode) -> f64 {
    node.start as f64 + node.duration
}

/// Blank, all-zero and NUL-padded ids mean "no parent".
fn is_empty_span_id(id: &str) -> bool {
    let id = id.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    id.bytes().all(|b| b == b'0')
}

fn metadata(row: &Row<'_>, entries: &[(&str, Option<usize>)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .filter_map(|&(key, position)| row.non_blank(position).map(|v| (key.to_string(), v)))
        .collect()
}

fn span_records(response: &ColumnarResponse) -> Vec<Record> {
    let index = response.field_index();
    let at = |name: &str| index.position(&[name]);
    let trace_id = at(alias::TRACE_ID);
    let span_id = at(alias::SPAN_ID);
    let parent_span_id = at(alias::PARENT_SPAN_ID);
    let span_name = at(alias::SPAN_NAME);
    let timestamp = at(alias::TIMESTAMP);
    let duration = at(alias::DURATION);
    let details = [
        ("status.code", at(alias::STATUS_CODE)),
        ("status.message", at(alias::STATUS_MESSAGE)),
        ("error.type", index.position(&[alias::ERROR_TYPE, "error.type"])),
    ];

    response
        .rows
        .iter()
        .map(|cells| {
            let row = Row::new(cells);
            let trace = row.non_blank(trace_id).unwrap_or_default();
            let span = row.non_blank(span_id).unwrap_or_default();
            Record {
                absolute: row.timestamp_ms(timestamp),
                node: TreeNode {
                    id: format!("span-{trace}-{span}"),
                    name: row
                        .non_blank(span_name)
                        .unwrap_or_else(|| "Unknown Span".to_string()),
                    kind: NodeKind::Span,
                    start: 0,
                    duration: (row.number(duration) / NANOS_PER_MILLI).max(0.0),
                    trace_id: trace,
                    span_id: span,
                    parent_span_id: row
                        .non_blank(parent_span_id)
                        .filter(|id| !is_empty_span_id(id)),
                    metadata: metadata(&row, &details),
                    children: Vec::new(),
                },
            }
        })
        .collect()
}

fn log_records(response: &ColumnarResponse) -> Vec<Record> {
    let index = response.field_index();
    let at = |name: &str| index.position(&[name]);
    let trace_id = at(alias::TRACE_ID);
    let span_id = at(alias::SPAN_ID);
    let timestamp = at(alias::TIMESTAMP);
    let body = at(alias::BODY);
    let details = [("severity", at(alias::SEVERITY)), ("body", body)];

    response
        .rows
        .iter()
        .map(|cells| {
            let row = Row::new(cells);
            let trace = row.non_blank(trace_id).unwrap_or_default();
            let span = row.non_blank(span_id).unwrap_or_default();
            let absolute = row.timestamp_ms(timestamp);
            Record {
                absolute,
                node: TreeNode {
                    id: format!("log-{trace}-{span}-{}", absolute.unwrap_or(0)),
                    name: row.non_blank(body).map_or_else(
                        || "Log".to_string(),
                        |body| body.chars().take(LOG_NAME_CHARS).collect(),
                    ),
                    kind: NodeKind::Log,
                    start: 0,
                    duration: 0.0,
                    trace_id: trace,
                    span_id: span,
                    parent_span_id: None,
                    metadata: metadata(&row, &details),
                    children: Vec::new(),
                },
            }
        })
        .collect()
}

fn exception_records(response: &ColumnarResponse) -> Vec<Record> {
    let index = response.field_index();
    let at = |name: &str| index.position(&[name]);
    let trace_id = at(alias::TRACE_ID);
    let span_id = at(alias::SPAN_ID);
    let timestamp = at(alias::TIMESTAMP);
    let pulse_type = at(alias::PULSE_TYPE);
    let title = at(alias::TITLE);
    let exception_type = at(alias::EXCEPTION_TYPE);
    let group_id = at(alias::GROUP_ID);
    let details = [
        ("pulse.type", pulse_type),
        ("title", title),
        ("exception.message", at(alias::EXCEPTION_MESSAGE)),
        ("exception.type", exception_type),
        ("screen.name", at(alias::SCREEN_NAME)),
        ("group.id", group_id),
    ];

    response
        .rows
        .iter()
        .map(|cells| {
            let row = Row::new(cells);
            let trace = row.non_blank(trace_id).unwrap_or_default();
            let group = row.non_blank(group_id).unwrap_or_default();
            let absolute = row.timestamp_ms(timestamp);
            let pulse = row.non_blank(pulse_type);
            let label = row
                .non_blank(title)
                .or_else(|| row.non_blank(exception_type))
                .or_else(|| pulse.clone())
                .unwrap_or_else(|| "Exception".to_string());
            Record {
                absolute,
                node: TreeNode {
                    id: format!("exception-{trace}-{group}-{}", absolute.unwrap_or(0)),
                    name: exception_name(pulse.as_deref().unwrap_or_default(), label),
                    kind: NodeKind::Exception,
                    start: 0,
                    duration: 0.0,
                    trace_id: trace,
                    span_id: row.non_blank(span_id).unwrap_or_default(),
                    parent_span_id: None,
                    metadata: metadata(&row, &details),
                    children: Vec::new(),
                },
            }
        })
        .collect()
}

/// Prefix the label with the failure family named by the pulse type.
fn exception_name(pulse_type: &str, label: String) -> String {
    let pulse_type = pulse_type.to_lowercase();
    let family = if pulse_type.contains("crash") {
        "Crash"
    } else if pulse_type.contains("anr") {
        "ANR"
    } else if pulse_type.contains("non_fatal") || pulse_type.contains("nonfatal") {
        "Non-Fatal"
    } else {
        return label;
    };
    format!("{family}: {label}")
}
