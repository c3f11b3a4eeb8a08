//! Request builders for session timeline queries.
//!
//! Projections are fixed per record family and independent of the scenario;
//! only the filter list varies. Aliases are shared with the response side
//! through the [`alias`] constants.

use crate::query::{DataType, Filter, OrderBy, QueryRequest, SelectItem, TimeRange};
use crate::scenario::{AttributeMap, Scenario, escape_like, session_filter};
use crate::types::SessionId;

/// Column aliases projected by the builders and read back by the assembler.
///
/// `ERROR` is the one exception: no builder projects it. It is only
/// present in externally produced responses, such as saved files passed to
/// `tl transform`, where a `"true"` value marks the row as an error.
pub mod alias {
    pub const TRACE_ID: &str = "traceid";
    pub const SPAN_ID: &str = "spanid";
    pub const PARENT_SPAN_ID: &str = "parentspanid";
    pub const SPAN_NAME: &str = "spanname";
    pub const TIMESTAMP: &str = "timestamp";
    pub const DURATION: &str = "duration";
    pub const DEVICE: &str = "device";
    pub const OS_VERSION: &str = "os_version";
    pub const OS_NAME: &str = "os_name";
    pub const STATE: &str = "state";
    pub const STATUS_CODE: &str = "statuscode";
    pub const STATUS_MESSAGE: &str = "statusmessage";
    pub const FROZEN_FRAME: &str = "frozen_frame";
    pub const ANALYSED_FRAME: &str = "analysed_frame";
    pub const UNANALYSED_FRAME: &str = "unanalysed_frame";
    pub const ANR: &str = "anr";
    pub const CRASH: &str = "crash";
    pub const EVENTS_TIMESTAMP: &str = "events_timestamp";
    pub const EVENTS_NAME: &str = "events_name";
    pub const EVENTS_ATTRIBUTES: &str = "events_attributes";
    pub const LINKS_TRACE_ID: &str = "links_traceid";
    pub const LINKS_SPAN_ID: &str = "links_spanid";
    pub const LINKS_TRACE_STATE: &str = "links_tracestate";
    pub const LINKS_ATTRIBUTES: &str = "links_attributes";
    pub const APP_BUILD_ID: &str = "app_build_id";
    pub const SDK_VERSION: &str = "sdk_version";
    pub const GEO_COUNTRY: &str = "geo_country";
    pub const NETWORK_PROVIDER: &str = "network_provider";
    pub const USER_ID: &str = "user_id";
    /// Error marker column of externally produced responses; never projected.
    pub const ERROR: &str = "error";
    pub const ERROR_TYPE: &str = "error_type";
    pub const ERROR_MESSAGE: &str = "error_message";
    pub const SEVERITY: &str = "severity";
    pub const BODY: &str = "body";
    pub const PULSE_TYPE: &str = "pulsetype";
    pub const TITLE: &str = "title";
    pub const EXCEPTION_MESSAGE: &str = "exceptionmessage";
    pub const EXCEPTION_TYPE: &str = "exceptiontype";
    pub const SCREEN_NAME: &str = "screenname";
    pub const GROUP_ID: &str = "groupid";
}

/// Row cap for exception queries.
pub const EXCEPTIONS_LIMIT: u32 = 1000;

/// Attribute key listing the interactions active while a span ran.
const ACTIVE_INTERACTION_NAMES: &str = "SpanAttributes['pulse.interaction.active.names']";

/// Build the TRACES request for a scenario.
pub fn traces_query(scenario: &Scenario, time_range: TimeRange) -> QueryRequest {
    let mut select = vec![
        SelectItem::col("TraceId", alias::TRACE_ID),
        SelectItem::col("SpanId", alias::SPAN_ID),
        SelectItem::col("ParentSpanId", alias::PARENT_SPAN_ID),
        SelectItem::col("SpanName", alias::SPAN_NAME),
        SelectItem::col("Timestamp", alias::TIMESTAMP),
        SelectItem::col("Duration", alias::DURATION),
    ];
    select.extend(device_columns());
    select.extend([
        SelectItem::col("StatusCode", alias::STATUS_CODE),
        SelectItem::col("StatusMessage", alias::STATUS_MESSAGE),
        frame_count("frozen_frame_count", alias::FROZEN_FRAME),
        frame_count("analysed_frame_count", alias::ANALYSED_FRAME),
        frame_count("unanalysed_frame_count", alias::UNANALYSED_FRAME),
        event_name_count("device.anr", alias::ANR),
        event_name_count("device.crash", alias::CRASH),
        joined("Events.Timestamp", ",", alias::EVENTS_TIMESTAMP),
        joined("Events.Name", ",", alias::EVENTS_NAME),
        joined("Events.Attributes", "|", alias::EVENTS_ATTRIBUTES),
        joined("Links.TraceId", ",", alias::LINKS_TRACE_ID),
        joined("Links.SpanId", ",", alias::LINKS_SPAN_ID),
        joined("Links.TraceState", ",", alias::LINKS_TRACE_STATE),
        joined("Links.Attributes", "|", alias::LINKS_ATTRIBUTES),
    ]);
    select.extend(resource_columns());
    select.extend([
        SelectItem::custom("SpanAttributes['user.id']", alias::USER_ID),
        SelectItem::custom("SpanAttributes['error.type']", alias::ERROR_TYPE),
        SelectItem::custom("SpanAttributes['error.message']", alias::ERROR_MESSAGE),
    ]);

    QueryRequest {
        data_type: DataType::Traces,
        time_range,
        select,
        filters: scenario.filters(AttributeMap::Span),
        group_by: None,
        order_by: Some(vec![OrderBy::asc(alias::TIMESTAMP)]),
        limit: None,
    }
}

/// Build the LOGS request for a scenario.
pub fn logs_query(scenario: &Scenario, time_range: TimeRange) -> QueryRequest {
    let mut select = vec![
        SelectItem::col("TraceId", alias::TRACE_ID),
        SelectItem::col("SpanId", alias::SPAN_ID),
        SelectItem::col("Timestamp", alias::TIMESTAMP),
        SelectItem::col("SeverityText", alias::SEVERITY),
        SelectItem::col("Body", alias::BODY),
    ];
    select.extend(device_columns());
    select.extend(resource_columns());

    QueryRequest {
        data_type: DataType::Logs,
        time_range,
        select,
        filters: scenario.filters(AttributeMap::Log),
        group_by: None,
        order_by: Some(vec![OrderBy::asc(alias::TIMESTAMP)]),
        limit: None,
    }
}

/// Build the EXCEPTIONS request for a session.
///
/// Exceptions are always session-wide; trace and interaction scoping do not
/// apply to the stack trace store.
pub fn exceptions_query(session_id: &SessionId, time_range: TimeRange) -> QueryRequest {
    QueryRequest {
        data_type: DataType::Exceptions,
        time_range,
        select: vec![
            SelectItem::col("Timestamp", alias::TIMESTAMP),
            SelectItem::col("PulseType", alias::PULSE_TYPE),
            SelectItem::col("Title", alias::TITLE),
            SelectItem::col("ExceptionMessage", alias::EXCEPTION_MESSAGE),
            SelectItem::col("ExceptionType", alias::EXCEPTION_TYPE),
            SelectItem::col("ScreenName", alias::SCREEN_NAME),
            SelectItem::col("TraceId", alias::TRACE_ID),
            SelectItem::col("SpanId", alias::SPAN_ID),
            SelectItem::col("GroupId", alias::GROUP_ID),
        ],
        filters: vec![session_filter(session_id)],
        group_by: None,
        order_by: Some(vec![OrderBy::asc(alias::TIMESTAMP)]),
        limit: Some(EXCEPTIONS_LIMIT),
    }
}

/// Build the follow-up TRACES request for spans recorded while the named
/// interaction was active.
///
/// Without a span name the request degrades to every span in the session.
pub fn interaction_spans_query(
    session_id: &SessionId,
    span_name: Option<&str>,
    time_range: TimeRange,
) -> QueryRequest {
    let mut filters = vec![session_filter(session_id)];
    if let Some(name) = span_name.map(str::trim).filter(|name| !name.is_empty()) {
        filters.push(Filter::like(
            ACTIVE_INTERACTION_NAMES,
            &format!("%{}%", escape_like(name)),
        ));
    }

    QueryRequest {
        data_type: DataType::Traces,
        time_range,
        select: vec![
            SelectItem::col("TraceId", alias::TRACE_ID),
            SelectItem::col("SpanId", alias::SPAN_ID),
            SelectItem::col("SpanName", alias::SPAN_NAME),
            SelectItem::col("Timestamp", alias::TIMESTAMP),
            SelectItem::col("Duration", alias::DURATION),
        ],
        filters,
        group_by: None,
        order_by: Some(vec![OrderBy::asc(alias::TIMESTAMP)]),
        limit: None,
    }
}

fn device_columns() -> [SelectItem; 4] {
    [
        SelectItem::col("DeviceModel", alias::DEVICE),
        SelectItem::col("OsVersion", alias::OS_VERSION),
        SelectItem::col("Platform", alias::OS_NAME),
        SelectItem::col("GeoState", alias::STATE),
    ]
}

fn resource_columns() -> [SelectItem; 4] {
    [
        SelectItem::custom("ResourceAttributes['app.build_id']", alias::APP_BUILD_ID),
        SelectItem::custom("ResourceAttributes['rum.sdk.version']", alias::SDK_VERSION),
        SelectItem::custom("ResourceAttributes['geo.country.iso_code']", alias::GEO_COUNTRY),
        SelectItem::custom("ResourceAttributes['network.carrier.name']", alias::NETWORK_PROVIDER),
    ]
}

fn frame_count(attribute: &str, alias: &str) -> SelectItem {
    SelectItem::custom(
        &format!("toFloat64OrZero(SpanAttributes['app.interaction.{attribute}'])"),
        alias,
    )
}

fn event_name_count(pattern: &str, alias: &str) -> SelectItem {
    SelectItem::custom(
        &format!("(arrayCount(x -> x LIKE '%{pattern}%', Events.Name))"),
        alias,
    )
}

fn joined(column: &str, separator: &str, alias: &str) -> SelectItem {
    SelectItem::custom(
        &format!("arrayStringConcat(arrayMap(x -> toString(x), {column}), '{separator}')"),
        alias,
    )
}
