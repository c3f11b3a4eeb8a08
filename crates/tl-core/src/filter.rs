//! Post-assembly selection over timeline events.

use crate::event_type::EventType;
use crate::timeline::TimelineEvent;

/// Events whose kind is in `kinds` and, for a non-blank `search`, whose name
/// or id contains it case-insensitively. Order is preserved.
pub fn filter_events<'a>(
    events: &'a [TimelineEvent],
    kinds: &[EventType],
    search: &str,
) -> Vec<&'a TimelineEvent> {
    let needle = search.trim().to_lowercase();
    events
        .iter()
        .filter(|event| kinds.contains(&event.event_type))
        .filter(|event| {
            needle.is_empty()
                || event.name.to_lowercase().contains(&needle)
                || event.id.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Furthest point reached by any event, in milliseconds from session start.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "relative offsets stay far below 2^52 ms"
)]
pub fn timeline_end<'a>(events: impl IntoIterator<Item = &'a TimelineEvent>) -> i64 {
    events
        .into_iter()
        .map(|event| {
            let end = event.timestamp as f64 + event.duration.unwrap_or(0.0);
            end.ceil() as i64
        })
        .max()
        .unwrap_or(0)
}
