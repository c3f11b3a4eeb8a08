//! Event classification.

use crate::event_type::EventType;

/// The per-row signals that decide an event's kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowSignals<'a> {
    /// Explicit error marker (`error = "true"` or an `Error` status code).
    pub error: bool,
    /// Error type attribute, possibly empty.
    pub error_type: &'a str,
    /// Frozen frame count for the span.
    pub frozen_frames: f64,
    /// Display name of the span or log entry.
    pub name: &'a str,
}

/// Assign exactly one event kind. The first matching rule wins:
///
/// 1. an error marker or non-empty error type: `crash` if the type mentions
///    a crash, `anr` if it mentions an ANR, otherwise `log`
/// 2. any frozen frames: `frozen_frame`
/// 3. a name mentioning "trace" or "request": `trace`
/// 4. `span`
pub fn classify(signals: &RowSignals<'_>) -> EventType {
    if signals.error || !signals.error_type.is_empty() {
        let error_type = signals.error_type.to_lowercase();
        if error_type.contains("crash") {
            EventType::Crash
        } else if error_type.contains("anr") {
            EventType::Anr
        } else {
            EventType::Log
        }
    } else if signals.frozen_frames > 0.0 {
        EventType::FrozenFrame
    } else {
        let name = signals.name.to_lowercase();
        if name.contains("trace") || name.contains("request") {
            EventType::Trace
        } else {
            EventType::Span
        }
    }
}
