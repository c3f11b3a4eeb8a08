//! Timeline command: fetch a session and render its events.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use tl_client::Client;
use tl_core::{
    EventType, SessionSummary, SpanTree, Timeline, TimelineEvent, TreeNode, filter_events,
    timeline_end,
};

use super::util::{resolve_scenario, resolve_window};
use crate::Config;
use crate::cli::{OutputArgs, SubjectArgs};

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    subject: &SubjectArgs,
    output: &OutputArgs,
) -> Result<()> {
    let scenario = resolve_scenario(subject)?;
    let time_range = resolve_window(
        subject.start.as_deref(),
        subject.end.as_deref(),
        config.lookback_hours,
        chrono::Utc::now(),
    )?;

    let client = Client::new(
        &config.api_base_url,
        config.api_token.clone(),
        config.timeout(),
    )
    .context("failed to create query client")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let data = runtime
        .block_on(client.fetch_session(&scenario, &time_range))
        .context("failed to fetch session")?;

    let timeline = data.trace_timeline(scenario.session_id().as_str());
    let tree = data.span_tree();
    render(writer, &timeline, Some(&tree), output)?;
    if !output.json && data.exceptions.is_none() {
        writeln!(writer, "Exceptions: unavailable")?;
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimelineView<'a> {
    summary: &'a SessionSummary,
    events: Vec<&'a TimelineEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    span_tree: Option<&'a SpanTree>,
}

/// Render a timeline as text or JSON, applying the kind and search filters
/// to the event list. The summary always describes the whole session, and
/// the span tree, when given, is rendered whole.
pub fn render<W: Write>(
    writer: &mut W,
    timeline: &Timeline,
    tree: Option<&SpanTree>,
    output: &OutputArgs,
) -> Result<()> {
    let kinds: &[EventType] = if output.kinds.is_empty() {
        &EventType::ALL
    } else {
        &output.kinds
    };
    let events = filter_events(
        &timeline.events,
        kinds,
        output.search.as_deref().unwrap_or_default(),
    );

    if output.json {
        let view = TimelineView {
            summary: &timeline.summary,
            events,
            span_tree: tree,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&view)?)?;
        return Ok(());
    }

    render_events(writer, timeline, &events)?;
    if let Some(tree) = tree {
        writeln!(writer)?;
        render_tree(writer, tree)?;
    }
    Ok(())
}

fn render_events<W: Write>(
    writer: &mut W,
    timeline: &Timeline,
    events: &[&TimelineEvent],
) -> Result<()> {
    let summary = &timeline.summary;
    writeln!(writer, "Session {}", summary.session_id)?;
    writeln!(
        writer,
        "Platform: {} | Status: {}",
        summary.platform.as_str(),
        summary.status.as_str()
    )?;
    writeln!(
        writer,
        "Duration: {}ms | Events: {} | Crashes: {} | ANRs: {} | Frozen frames: {}",
        summary.duration, summary.total_events, summary.crashes, summary.anrs, summary.frozen_frames
    )?;
    if let Some(name) = &summary.span_name {
        writeln!(writer, "Name: {name}")?;
    }
    writeln!(writer)?;

    if events.is_empty() {
        writeln!(writer, "No events.")?;
        return Ok(());
    }

    writeln!(writer, "Events:")?;
    for event in events {
        let offset = format!("+{}ms", event.timestamp);
        let duration = event
            .duration
            .map(|ms| format!(" ({ms:.1}ms)"))
            .unwrap_or_default();
        writeln!(
            writer,
            "  {offset:>9}  {:<12}  {}{duration}",
            event.event_type.as_str(),
            event.name
        )?;
    }
    writeln!(writer, "Ends at +{}ms", timeline_end(events.iter().copied()))?;
    Ok(())
}

fn render_tree<W: Write>(writer: &mut W, tree: &SpanTree) -> Result<()> {
    writeln!(
        writer,
        "Span tree: {} roots | Depth: {} | Orphans: {} | Duration: {:.1}ms",
        tree.roots.len(),
        tree.depth,
        tree.orphans().count(),
        tree.session_duration
    )?;
    for root in &tree.roots {
        render_node(writer, root, 1)?;
    }
    Ok(())
}

fn render_node<W: Write>(writer: &mut W, node: &TreeNode, level: usize) -> Result<()> {
    let duration = if node.duration > 0.0 {
        format!(" ({:.1}ms)", node.duration)
    } else {
        String::new()
    };
    writeln!(
        writer,
        "{:indent$}+{}ms [{}] {}{duration}",
        "",
        node.start,
        node.kind.as_str(),
        node.name,
        indent = level * 2
    )?;
    for child in &node.children {
        render_node(writer, child, level + 1)?;
    }
    Ok(())
}
