//! Timeline query scenarios and their filter sets.
//!
//! A scenario is decided by which identifiers the caller supplied. Each
//! variant maps to exactly one filter list, so adding a scenario forces every
//! consumer match to handle it.

use crate::query::Filter;
use crate::types::{InteractionId, SessionId, TraceId};

/// Attribute map column that carries interaction ids for a record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeMap {
    Span,
    Log,
}

impl AttributeMap {
    const fn column(self) -> &'static str {
        match self {
            Self::Span => "SpanAttributes",
            Self::Log => "LogAttributes",
        }
    }
}

/// Attribute key holding the list of interaction ids a record belongs to.
const INTERACTION_IDS_KEY: &str = "pulse.interaction.ids";

/// Which identifiers narrow a timeline query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// Every record in the session.
    SessionOnly { session_id: SessionId },
    /// Records of a single trace within the session.
    SessionAndTrace {
        session_id: SessionId,
        trace_id: TraceId,
    },
    /// Records tagged with an interaction, or belonging to its root trace.
    SessionAndInteraction {
        session_id: SessionId,
        interaction_id: InteractionId,
    },
}

impl Scenario {
    /// Picks the scenario for the supplied identifiers.
    ///
    /// Blank identifiers count as absent. Returns `None` without a session,
    /// in which case no request should be issued. An interaction id takes
    /// precedence over a trace id.
    pub fn determine(
        session_id: Option<&str>,
        trace_id: Option<&str>,
        interaction_id: Option<&str>,
    ) -> Option<Self> {
        let session_id = SessionId::from_optional(session_id)?;

        let scenario = if let Some(interaction_id) = InteractionId::from_optional(interaction_id) {
            Self::SessionAndInteraction {
                session_id,
                interaction_id,
            }
        } else if let Some(trace_id) = TraceId::from_optional(trace_id) {
            Self::SessionAndTrace {
                session_id,
                trace_id,
            }
        } else {
            Self::SessionOnly { session_id }
        };

        tracing::debug!(scenario = scenario.name(), "selected timeline scenario");
        Some(scenario)
    }

    pub const fn session_id(&self) -> &SessionId {
        match self {
            Self::SessionOnly { session_id }
            | Self::SessionAndTrace { session_id, .. }
            | Self::SessionAndInteraction { session_id, .. } => session_id,
        }
    }

    /// Stable scenario label, e.g. for logs and cache keys.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SessionOnly { .. } => "sessionId",
            Self::SessionAndTrace { .. } => "sessionId+traceId",
            Self::SessionAndInteraction { .. } => "sessionId+interactionTraceId",
        }
    }

    /// Filters for this scenario. The session filter always comes first.
    pub fn filters(&self, attributes: AttributeMap) -> Vec<Filter> {
        let mut filters = vec![session_filter(self.session_id())];
        match self {
            Self::SessionOnly { .. } => {}
            Self::SessionAndTrace { trace_id, .. } => {
                filters.push(Filter::eq("TraceId", trace_id.as_str()));
            }
            Self::SessionAndInteraction { interaction_id, .. } => {
                filters.push(interaction_filter(interaction_id, attributes));
            }
        }
        filters
    }
}

pub(crate) fn session_filter(session_id: &SessionId) -> Filter {
    Filter::eq("SessionId", session_id.as_str())
}

fn interaction_filter(interaction_id: &InteractionId, attributes: AttributeMap) -> Filter {
    let id = interaction_id.as_str();
    Filter::additional(format!(
        "{}['{INTERACTION_IDS_KEY}'] LIKE '%{}%' OR TraceId = '{}'",
        attributes.column(),
        escape_like(id),
        escape_string(id),
    ))
}

/// Escape a value for a single-quoted string literal.
pub(crate) fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "''")
}

/// Escape a value for use inside a single-quoted LIKE pattern.
pub(crate) fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('\'', "''")
}
