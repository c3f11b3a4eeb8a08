//! Query command: print the request a timeline fetch would send.

use std::io::Write;

use anyhow::Result;
use tl_core::{
    QueryRequest, Scenario, TimeRange, exceptions_query, interaction_spans_query, logs_query,
    traces_query,
};

use crate::cli::QueryKind;

pub fn build(
    scenario: &Scenario,
    kind: QueryKind,
    span_name: Option<&str>,
    time_range: TimeRange,
) -> QueryRequest {
    match kind {
        QueryKind::Traces => traces_query(scenario, time_range),
        QueryKind::Logs => logs_query(scenario, time_range),
        QueryKind::Exceptions => exceptions_query(scenario.session_id(), time_range),
        QueryKind::InteractionSpans => {
            interaction_spans_query(scenario.session_id(), span_name, time_range)
        }
    }
}

pub fn run<W: Write>(writer: &mut W, request: &QueryRequest) -> Result<()> {
    request.validate()?;
    writeln!(writer, "{}", serde_json::to_string_pretty(request)?)?;
    Ok(())
}
