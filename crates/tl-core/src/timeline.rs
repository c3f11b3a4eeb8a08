//! Session timeline reconstruction.
//!
//! Folds a columnar response into an ordered list of [`TimelineEvent`]s and a
//! [`SessionSummary`].
//!
//! # Algorithm Summary
//!
//! 1. Resolve every known column once against the response's field list
//! 2. Take session-wide resource attributes from the first row
//! 3. Walk rows in response order, anchoring relative time on the first
//!    parsable timestamp and counting crash/ANR signals
//! 4. Derive duration and status, then stable-sort events by relative time
//!
//! The fold is total: malformed input degrades to defaults, never to errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::builder::alias;
use crate::classify::{RowSignals, classify};
use crate::event_type::EventType;
use crate::response::{ColumnarResponse, FieldIndex, Row};
use crate::span_detail::{SpanEvent, SpanLink, parse_span_events, parse_span_links};

/// Name used when a row carries no name column at all.
pub const UNKNOWN_NAME: &str = "Unknown";

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Operating system family of the session's device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Web,
    #[default]
    Unknown,
}

impl Platform {
    /// Derive the platform from an OS name by substring match.
    pub fn from_os_name(os_name: &str) -> Self {
        let os_name = os_name.to_lowercase();
        if os_name.contains("android") {
            Self::Android
        } else if os_name.contains("ios") {
            Self::Ios
        } else if os_name.contains("web") {
            Self::Web
        } else {
            Self::Unknown
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Web => "web",
            Self::Unknown => "unknown",
        }
    }
}

/// Lifecycle state of a session as seen in its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Crashed,
}

impl SessionStatus {
    /// `crashed` if any crash was seen, else `completed` once time has
    /// elapsed, else `active`.
    pub const fn derive(crashes: u64, duration_ms: i64) -> Self {
        if crashes > 0 {
            Self::Crashed
        } else if duration_ms > 0 {
            Self::Completed
        } else {
            Self::Active
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Crashed => "crashed",
        }
    }
}

/// The two independent sources behind the summary's failure counts.
///
/// Row counts come from the array-scan `crash`/`anr` columns; classified
/// counts come from event classification. They are kept apart so consumers
/// can tell a crash event recorded on a span from a crash-typed error row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalCounts {
    pub row_crashes: u64,
    pub row_anrs: u64,
    pub classified_crashes: u64,
    pub classified_anrs: u64,
    pub classified_frozen_frames: u64,
}

/// Session-level rollup of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub platform: Platform,
    pub status: SessionStatus,
    /// Milliseconds between the first and the latest timestamp.
    pub duration: i64,
    pub crashes: u64,
    pub anrs: u64,
    pub frozen_frames: u64,
    pub total_events: usize,
    /// Name of the first row, used as a human label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_name: Option<String>,
    #[serde(default)]
    pub signals: SignalCounts,
}

impl SessionSummary {
    /// The summary of a session with no records.
    pub fn empty(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            platform: Platform::Unknown,
            status: SessionStatus::Completed,
            duration: 0,
            crashes: 0,
            anrs: 0,
            frozen_frames: 0,
            total_events: 0,
            span_name: None,
            signals: SignalCounts::default(),
        }
    }
}

/// Passthrough metadata for an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttributes {
    /// Session-wide attributes, taken from the first row.
    pub resource: BTreeMap<String, String>,
    /// Per-row attributes such as error type and status.
    pub span: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<SpanLink>,
}

/// One entry on the session timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Milliseconds since the session's first timestamp, never negative.
    pub timestamp: i64,
    /// Wall-clock epoch milliseconds, when the row's timestamp parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_timestamp: Option<i64>,
    /// Milliseconds, only when positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub attributes: EventAttributes,
}

/// A reconstructed session: rollup plus time-ordered events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub summary: SessionSummary,
    pub events: Vec<TimelineEvent>,
}

impl Timeline {
    pub fn empty(session_id: &str) -> Self {
        Self {
            summary: SessionSummary::empty(session_id),
            events: Vec::new(),
        }
    }
}

/// Column positions resolved once per response.
#[derive(Debug, Clone, Copy)]
struct Columns {
    trace_id: Option<usize>,
    span_id: Option<usize>,
    parent_span_id: Option<usize>,
    span_name: Option<usize>,
    body: Option<usize>,
    timestamp: Option<usize>,
    duration: Option<usize>,
    device: Option<usize>,
    os_version: Option<usize>,
    os_name: Option<usize>,
    state: Option<usize>,
    app_build_id: Option<usize>,
    sdk_version: Option<usize>,
    geo_country: Option<usize>,
    network_provider: Option<usize>,
    status_code: Option<usize>,
    status_message: Option<usize>,
    error: Option<usize>,
    error_type: Option<usize>,
    error_message: Option<usize>,
    user_id: Option<usize>,
    frozen_frame: Option<usize>,
    anr: Option<usize>,
    crash: Option<usize>,
    events_timestamp: Option<usize>,
    events_name: Option<usize>,
    events_attributes: Option<usize>,
    links_trace_id: Option<usize>,
    links_span_id: Option<usize>,
    links_trace_state: Option<usize>,
    links_attributes: Option<usize>,
}

impl Columns {
    fn resolve(index: &FieldIndex) -> Self {
        let at = |name: &str| index.position(&[name]);
        Self {
            trace_id: at(alias::TRACE_ID),
            span_id: at(alias::SPAN_ID),
            parent_span_id: at(alias::PARENT_SPAN_ID),
            span_name: at(alias::SPAN_NAME),
            body: at(alias::BODY),
            timestamp: at(alias::TIMESTAMP),
            duration: at(alias::DURATION),
            device: index.position(&[alias::DEVICE, "devicemodel"]),
            os_version: index.position_or_containing(&[alias::OS_VERSION], "os.version"),
            os_name: index.position_or_containing(&[alias::OS_NAME], "os.name"),
            state: at(alias::STATE),
            app_build_id: at(alias::APP_BUILD_ID),
            sdk_version: at(alias::SDK_VERSION),
            geo_country: at(alias::GEO_COUNTRY),
            network_provider: at(alias::NETWORK_PROVIDER),
            status_code: at(alias::STATUS_CODE),
            status_message: at(alias::STATUS_MESSAGE),
            error: at(alias::ERROR),
            error_type: index.position(&[alias::ERROR_TYPE, "error.type"]),
            error_message: index.position(&[alias::ERROR_MESSAGE, "error.message"]),
            user_id: at(alias::USER_ID),
            frozen_frame: index.position(&[alias::FROZEN_FRAME, "frozenframe"]),
            anr: at(alias::ANR),
            crash: at(alias::CRASH),
            events_timestamp: at(alias::EVENTS_TIMESTAMP),
            events_name: at(alias::EVENTS_NAME),
            events_attributes: at(alias::EVENTS_ATTRIBUTES),
            links_trace_id: at(alias::LINKS_TRACE_ID),
            links_span_id: at(alias::LINKS_SPAN_ID),
            links_trace_state: at(alias::LINKS_TRACE_STATE),
            links_attributes: at(alias::LINKS_ATTRIBUTES),
        }
    }

    /// Session-wide attributes; blank values are dropped.
    fn resource_attributes(&self, first: &Row<'_>) -> BTreeMap<String, String> {
        [
            ("device.model", self.device),
            ("os.version", self.os_version),
            ("os.name", self.os_name),
            ("geo.state", self.state),
            ("app.build_id", self.app_build_id),
            ("rum.sdk.version", self.sdk_version),
            ("geo.country.iso_code", self.geo_country),
            ("network.carrier.name", self.network_provider),
        ]
        .into_iter()
        .filter_map(|(key, position)| first.non_blank(position).map(|v| (key.to_string(), v)))
        .collect()
    }
}

/// Non-negative count from a permissively parsed number.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is rounded, finite and non-negative before the cast"
)]
fn count(value: f64) -> u64 {
    if value > 0.0 { value.round() as u64 } else { 0 }
}

/// Rebuild a session timeline from a columnar response.
///
/// `session_id` labels the summary; it is not read from the rows.
pub fn assemble_timeline(response: &ColumnarResponse, session_id: &str) -> Timeline {
    let Some(first_cells) = response.rows.first() else {
        tracing::debug!(session_id, "no rows, returning empty timeline");
        return Timeline::empty(session_id);
    };

    let columns = Columns::resolve(&response.field_index());
    let first = Row::new(first_cells);
    let resource = columns.resource_attributes(&first);
    let platform = resource
        .get("os.name")
        .map_or(Platform::Unknown, |os| Platform::from_os_name(os));
    let span_name = first.non_blank(columns.span_name);

    let mut signals = SignalCounts::default();
    let mut session_start: Option<i64> = None;
    let mut max_timestamp: i64 = 0;
    let mut events = Vec::with_capacity(response.rows.len());

    for (index, cells) in response.rows.iter().enumerate() {
        let row = Row::new(cells);

        if !row.cell(columns.crash).is_null() {
            signals.row_crashes = signals
                .row_crashes
                .saturating_add(count(row.number(columns.crash)));
        }
        if !row.cell(columns.anr).is_null() {
            signals.row_anrs = signals
                .row_anrs
                .saturating_add(count(row.number(columns.anr)));
        }

        let absolute = row.timestamp_ms(columns.timestamp);
        if session_start.is_none() {
            session_start = absolute;
        }
        let relative = session_start.map_or(0, |start| (absolute.unwrap_or(0) - start).max(0));
        if let Some(absolute) = absolute {
            max_timestamp = max_timestamp.max(absolute);
        }

        let duration_ms = row.number(columns.duration) / NANOS_PER_MILLI;

        let name = event_name(&row, &columns);
        let error_type = row.text(columns.error_type);
        let status_code = row.text(columns.status_code);
        let frozen_frames = row.number(columns.frozen_frame);
        let event_type = classify(&RowSignals {
            error: row.text(columns.error).eq_ignore_ascii_case("true") || status_code == "Error",
            error_type: &error_type,
            frozen_frames,
            name: &name,
        });
        let counter = match event_type {
            EventType::Crash => Some(&mut signals.classified_crashes),
            EventType::Anr => Some(&mut signals.classified_anrs),
            EventType::FrozenFrame => Some(&mut signals.classified_frozen_frames),
            EventType::Span | EventType::Trace | EventType::Log => None,
        };
        if let Some(counter) = counter {
            *counter = counter.saturating_add(1);
        }

        let mut attributes = EventAttributes {
            resource: resource.clone(),
            span: span_attributes(&row, &columns, frozen_frames),
            trace_id: row.non_blank(columns.trace_id),
            parent_span_id: row.non_blank(columns.parent_span_id),
            ..EventAttributes::default()
        };
        attributes.events = parse_span_events(
            &row.text(columns.events_timestamp),
            &row.text(columns.events_name),
            &row.text(columns.events_attributes),
        );
        attributes.links = parse_span_links(
            &row.text(columns.links_trace_id),
            &row.text(columns.links_span_id),
            &row.text(columns.links_trace_state),
            &row.text(columns.links_attributes),
        );

        let span_id = row.text(columns.span_id);
        events.push(TimelineEvent {
            id: if span_id.is_empty() {
                format!("span-{index}")
            } else {
                span_id.into_owned()
            },
            name,
            event_type,
            timestamp: relative,
            absolute_timestamp: absolute,
            duration: (duration_ms > 0.0).then_some(duration_ms),
            attributes,
        });
    }

    let duration = session_start.map_or(0, |start| max_timestamp - start);
    if session_start.is_none() {
        tracing::debug!(session_id, "no parsable timestamps in response");
    }

    let crashes = signals.row_crashes.saturating_add(signals.classified_crashes);
    let anrs = signals.row_anrs.saturating_add(signals.classified_anrs);

    // Stable, so rows sharing a timestamp keep response order.
    events.sort_by_key(|event| event.timestamp);

    let summary = SessionSummary {
        session_id: session_id.to_string(),
        platform,
        status: SessionStatus::derive(crashes, duration),
        duration,
        crashes,
        anrs,
        frozen_frames: signals.classified_frozen_frames,
        total_events: events.len(),
        span_name,
        signals,
    };
    tracing::debug!(
        session_id,
        events = summary.total_events,
        status = summary.status.as_str(),
        "assembled timeline"
    );

    Timeline { summary, events }
}

/// Span name, else a log body, else [`UNKNOWN_NAME`] when neither column
/// was projected.
fn event_name(row: &Row<'_>, columns: &Columns) -> String {
    if columns.span_name.is_some() {
        return row.text(columns.span_name).into_owned();
    }
    row.non_blank(columns.body)
        .unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

fn span_attributes(
    row: &Row<'_>,
    columns: &Columns,
    frozen_frames: f64,
) -> BTreeMap<String, serde_json::Value> {
    let mut span = BTreeMap::new();
    for (key, position) in [
        ("status.code", columns.status_code),
        ("status.message", columns.status_message),
        ("error.type", columns.error_type),
        ("error.message", columns.error_message),
        ("user.id", columns.user_id),
    ] {
        let value = row.text(position);
        if !value.is_empty() {
            span.insert(key.to_string(), serde_json::Value::from(value.into_owned()));
        }
    }
    if frozen_frames > 0.0 {
        span.insert(
            "app.interaction.frozen_frame_count".to_string(),
            serde_json::Value::from(frozen_frames),
        );
    }
    span
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::response::Cell;

    const T0: &str = "2025-01-15T09:00:00.000Z";

    fn response(fields: &[&str], rows: Vec<Vec<Cell>>) -> ColumnarResponse {
        ColumnarResponse {
            fields: fields.iter().map(ToString::to_string).collect(),
            rows,
        }
    }

    fn text(value: &str) -> Cell {
        Cell::from(value)
    }

    #[test]
    fn empty_response_yields_zeroed_summary() {
        let timeline = assemble_timeline(&ColumnarResponse::default(), "trace-abc");
        assert!(timeline.events.is_empty());
        assert_eq!(timeline.summary, SessionSummary::empty("trace-abc"));
        assert_eq!(timeline.summary.status, SessionStatus::Completed);
        assert_eq!(timeline.summary.platform, Platform::Unknown);
        assert_eq!(timeline.summary.duration, 0);
        assert_eq!(timeline.summary.total_events, 0);
    }

    #[test]
    fn crash_row_after_start_marks_session_crashed() {
        let timeline = assemble_timeline(
            &response(
                &["spanid", "spanname", "timestamp", "error_type"],
                vec![
                    vec![text("a"), text("start"), text(T0), Cell::Null],
                    vec![
                        text("b"),
                        text("crash"),
                        text("2025-01-15T09:00:01.500Z"),
                        text("Crash: NPE"),
                    ],
                ],
            ),
            "sess",
        );

        assert_eq!(timeline.events[0].event_type, EventType::Span);
        assert_eq!(timeline.events[1].event_type, EventType::Crash);
        assert_eq!(timeline.events[1].timestamp, 1500);
        assert_eq!(timeline.summary.crashes, 1);
        assert_eq!(timeline.summary.duration, 1500);
        assert_eq!(timeline.summary.status, SessionStatus::Crashed);
        assert_eq!(
            timeline.events[1].attributes.span["error.type"],
            serde_json::json!("Crash: NPE")
        );
    }

    #[test]
    fn single_frozen_frame_row_is_active_with_zero_duration() {
        let timeline = assemble_timeline(
            &response(
                &["spanid", "spanname", "timestamp", "frozen_frame"],
                vec![vec![text("a"), text("scroll"), text(T0), Cell::Number(3.0)]],
            ),
            "sess",
        );

        assert_eq!(timeline.events[0].event_type, EventType::FrozenFrame);
        assert_eq!(timeline.summary.frozen_frames, 1);
        assert_eq!(timeline.summary.duration, 0);
        assert_eq!(timeline.summary.status, SessionStatus::Active);
    }

    #[test]
    fn missing_name_column_falls_back_to_unknown() {
        let timeline = assemble_timeline(
            &response(&["spanid", "timestamp"], vec![vec![text("a"), text(T0)]]),
            "sess",
        );
        assert_eq!(timeline.events[0].name, UNKNOWN_NAME);
        assert_eq!(timeline.summary.span_name, None);
    }

    #[test]
    fn log_rows_are_named_by_body() {
        let timeline = assemble_timeline(
            &response(
                &["spanid", "timestamp", "body"],
                vec![vec![text("a"), text(T0), text("  user tapped pay ")]],
            ),
            "sess",
        );
        assert_eq!(timeline.events[0].name, "user tapped pay");
    }

    #[test]
    fn out_of_order_rows_are_sorted_and_clamped() {
        let timeline = assemble_timeline(
            &response(
                &["spanid", "timestamp"],
                vec![
                    vec![text("late"), text("2025-01-15T09:00:05Z")],
                    vec![text("early"), text("2025-01-15T09:00:01Z")],
                    vec![text("mid"), text("2025-01-15T09:00:07Z")],
                ],
            ),
            "sess",
        );

        let order: Vec<(&str, i64)> = timeline
            .events
            .iter()
            .map(|e| (e.id.as_str(), e.timestamp))
            .collect();
        assert_eq!(order, vec![("late", 0), ("early", 0), ("mid", 2000)]);
        assert!(timeline.events.iter().all(|e| e.timestamp >= 0));
        assert_eq!(timeline.summary.duration, 2000);
    }

    #[test]
    fn rows_before_first_timestamp_sit_at_zero() {
        let timeline = assemble_timeline(
            &response(
                &["timestamp"],
                vec![
                    vec![text("garbage")],
                    vec![text(T0)],
                    vec![text("2025-01-15T09:00:00.250Z")],
                ],
            ),
            "sess",
        );

        assert_eq!(timeline.events[0].id, "span-0");
        assert_eq!(timeline.events[0].absolute_timestamp, None);
        assert_eq!(timeline.events[0].timestamp, 0);
        assert_eq!(timeline.events[2].timestamp, 250);
        assert_eq!(timeline.summary.duration, 250);
        assert_eq!(timeline.summary.status, SessionStatus::Completed);
    }

    #[test]
    fn no_parsable_timestamps_means_active_session() {
        let timeline = assemble_timeline(
            &response(&["spanid"], vec![vec![text("a")], vec![text("b")]]),
            "sess",
        );
        assert_eq!(timeline.summary.duration, 0);
        assert_eq!(timeline.summary.status, SessionStatus::Active);
        assert_eq!(timeline.summary.total_events, 2);
    }

    #[test]
    fn row_aggregates_and_classification_are_counted_separately() {
        let timeline = assemble_timeline(
            &response(
                &["spanname", "timestamp", "crash", "anr", "error_type"],
                vec![
                    vec![text("screen"), text(T0), Cell::Number(2.0), text("1"), Cell::Null],
                    vec![
                        text("app"),
                        text("2025-01-15T09:00:03Z"),
                        Cell::Null,
                        Cell::Number(0.0),
                        text("ANR detected"),
                    ],
                ],
            ),
            "sess",
        );

        let signals = timeline.summary.signals;
        assert_eq!(signals.row_crashes, 2);
        assert_eq!(signals.row_anrs, 1);
        assert_eq!(signals.classified_crashes, 0);
        assert_eq!(signals.classified_anrs, 1);
        assert_eq!(timeline.summary.crashes, 2);
        assert_eq!(timeline.summary.anrs, 2);
        assert_eq!(timeline.summary.status, SessionStatus::Crashed);
    }

    #[test]
    fn huge_row_counts_saturate_instead_of_overflowing() {
        let timeline = assemble_timeline(
            &response(
                &["spanname", "timestamp", "crash", "anr"],
                vec![
                    vec![text("screen"), text(T0), text("1e300"), text("1e300")],
                    vec![text("app"), text(T0), Cell::Number(1.0), Cell::Number(1.0)],
                    vec![
                        text("app"),
                        text(T0),
                        Cell::Number(f64::MAX),
                        Cell::Number(f64::MAX),
                    ],
                ],
            ),
            "sess",
        );

        let summary = &timeline.summary;
        assert_eq!(summary.signals.row_crashes, u64::MAX);
        assert_eq!(summary.signals.row_anrs, u64::MAX);
        assert_eq!(summary.crashes, u64::MAX);
        assert_eq!(summary.anrs, u64::MAX);
        assert_eq!(summary.status, SessionStatus::Crashed);
    }

    #[test]
    fn resource_attributes_come_from_first_row_only() {
        let timeline = assemble_timeline(
            &response(
                &["DeviceModel", "os_version", "os_name", "state", "timestamp"],
                vec![
                    vec![text(" Pixel 8 "), text("   "), text("Android"), Cell::Null, text(T0)],
                    vec![text("iPhone"), text("17"), text("iOS"), text("KA"), text(T0)],
                ],
            ),
            "sess",
        );

        assert_eq!(timeline.summary.platform, Platform::Android);
        for event in &timeline.events {
            let resource = &event.attributes.resource;
            assert_eq!(resource.get("device.model").map(String::as_str), Some("Pixel 8"));
            assert_eq!(resource.get("os.name").map(String::as_str), Some("Android"));
            assert!(!resource.contains_key("os.version"));
            assert!(!resource.contains_key("geo.state"));
        }
    }

    #[test]
    fn duration_is_converted_from_nanoseconds() {
        let timeline = assemble_timeline(
            &response(
                &["timestamp", "duration"],
                vec![
                    vec![text(T0), Cell::Number(2_500_000.0)],
                    vec![text(T0), text("0")],
                ],
            ),
            "sess",
        );
        assert_eq!(timeline.events[0].duration, Some(2.5));
        assert_eq!(timeline.events[1].duration, None);
    }

    #[test]
    fn error_status_code_counts_as_error_marker() {
        let timeline = assemble_timeline(
            &response(
                &["spanname", "statuscode", "statusmessage"],
                vec![vec![text("fetch request"), text("Error"), text("timeout")]],
            ),
            "sess",
        );
        let event = &timeline.events[0];
        assert_eq!(event.event_type, EventType::Log);
        assert_eq!(event.attributes.span["status.code"], serde_json::json!("Error"));
        assert_eq!(event.attributes.span["status.message"], serde_json::json!("timeout"));
    }

    #[test]
    fn saved_response_error_marker_is_honoured() {
        let timeline = assemble_timeline(
            &response(
                &["spanname", "error", "error_type"],
                vec![
                    vec![text("load feed"), text("TRUE"), Cell::Null],
                    vec![text("load feed"), text("false"), Cell::Null],
                    vec![text("app"), Cell::Bool(true), text("ANR detected")],
                ],
            ),
            "sess",
        );
        let kinds: Vec<EventType> = timeline.events.iter().map(|e| e.event_type).collect();
        assert_eq!(kinds, vec![EventType::Log, EventType::Span, EventType::Anr]);
        assert_eq!(timeline.summary.anrs, 1);
    }

    #[test]
    fn trace_rows_carry_ids_events_and_links() {
        let timeline = assemble_timeline(
            &response(
                &[
                    "traceid",
                    "spanid",
                    "parentspanid",
                    "events_timestamp",
                    "events_name",
                    "links_traceid",
                    "links_spanid",
                ],
                vec![vec![
                    text("t-1"),
                    text("s-2"),
                    text(""),
                    text("2025-01-15 09:00:00.100"),
                    text("device.crash"),
                    text("t-0"),
                    text("s-0"),
                ]],
            ),
            "sess",
        );
        let attributes = &timeline.events[0].attributes;
        assert_eq!(attributes.trace_id.as_deref(), Some("t-1"));
        assert_eq!(attributes.parent_span_id, None);
        assert_eq!(attributes.events.len(), 1);
        assert_eq!(attributes.events[0].name, "device.crash");
        assert_eq!(attributes.links[0].span_id, "s-0");
    }

    #[test]
    fn summary_serializes_camel_case() {
        let timeline = assemble_timeline(
            &response(&["spanname"], vec![vec![text("Checkout")]]),
            "sess",
        );
        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json["summary"]["sessionId"], "sess");
        assert_eq!(json["summary"]["frozenFrames"], 0);
        assert_eq!(json["summary"]["totalEvents"], 1);
        assert_eq!(json["summary"]["spanName"], "Checkout");
        assert_eq!(json["summary"]["status"], "active");
        assert_eq!(json["events"][0]["type"], "span");
        assert!(json["events"][0].get("absoluteTimestamp").is_none());
    }

    #[test]
    fn platform_from_os_name() {
        assert_eq!(Platform::from_os_name("AndroidFull"), Platform::Android);
        assert_eq!(Platform::from_os_name("iOS"), Platform::Ios);
        assert_eq!(Platform::from_os_name("web-chrome"), Platform::Web);
        assert_eq!(Platform::from_os_name("tizen"), Platform::Unknown);
    }

    #[test]
    fn status_derivation() {
        assert_eq!(SessionStatus::derive(1, 0), SessionStatus::Crashed);
        assert_eq!(SessionStatus::derive(0, 10), SessionStatus::Completed);
        assert_eq!(SessionStatus::derive(0, 0), SessionStatus::Active);
    }
}
