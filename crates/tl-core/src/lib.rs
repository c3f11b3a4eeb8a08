//! Core logic for session timeline analytics.
//!
//! This crate contains the pure, synchronous half of the system:
//! - Query building: scenario-driven `QueryRequest`s for traces, logs and exceptions
//! - Response normalization: column resolution and defensive scalar extraction
//! - Timeline assembly: classified, time-ordered events plus a session summary
//! - Span trees: spans, logs and exceptions nested per trace

pub mod builder;
mod classify;
pub mod event_type;
mod filter;
pub mod query;
pub mod response;
pub mod scenario;
pub mod span_detail;
pub mod span_tree;
pub mod timeline;
pub mod types;

pub use builder::{exceptions_query, interaction_spans_query, logs_query, traces_query};
pub use classify::{RowSignals, classify};
pub use event_type::{EventType, UnknownEventType};
pub use filter::{filter_events, timeline_end};
pub use query::{DataType, Filter, FilterOperator, QueryError, QueryRequest, TimeRange};
pub use response::{Cell, ColumnarResponse};
pub use scenario::Scenario;
pub use span_tree::{NodeKind, SpanTree, TreeNode, build_span_tree};
pub use timeline::{
    Platform, SessionStatus, SessionSummary, Timeline, TimelineEvent, assemble_timeline,
};
pub use types::{InteractionId, SessionId, TraceId, ValidationError};
