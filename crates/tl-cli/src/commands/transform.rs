//! Transform command: assemble a timeline from a saved response.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tl_core::assemble_timeline;

use super::timeline::render;
use crate::cli::OutputArgs;

pub fn run<W: Write>(
    writer: &mut W,
    input: &Path,
    session_id: &str,
    output: &OutputArgs,
) -> Result<()> {
    let body = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let response = tl_client::decode_body(200, &body)
        .with_context(|| format!("failed to decode {}", input.display()))?;
    tracing::debug!(rows = response.rows.len(), "loaded saved response");

    let timeline = assemble_timeline(&response, session_id);
    render(writer, &timeline, None, output)
}
