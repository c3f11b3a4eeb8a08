//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tl_core::EventType;

/// Session timeline analytics.
///
/// Builds columnar queries for a session's traces, logs and exceptions, runs
/// them against the analytics API, and reconstructs a time-ordered timeline.
#[derive(Debug, Parser)]
#[command(name = "tl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the query request for a session without sending it.
    Query {
        #[command(flatten)]
        subject: SubjectArgs,

        /// Record family to query.
        #[arg(long, value_enum, default_value_t = QueryKind::Traces)]
        data_type: QueryKind,

        /// Interaction name for `interaction-spans` queries.
        #[arg(long)]
        span_name: Option<String>,
    },

    /// Fetch a session and print its timeline.
    Timeline {
        #[command(flatten)]
        subject: SubjectArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build a timeline from a saved query response.
    Transform {
        /// JSON response file, enveloped or bare `{fields, rows}`.
        #[arg(long)]
        input: PathBuf,

        /// Session id to label the summary with.
        #[arg(long, default_value = "unknown")]
        session: String,

        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Identifiers and window selecting what to query.
#[derive(Debug, Clone, Args)]
pub struct SubjectArgs {
    /// Session id (required).
    #[arg(long)]
    pub session: String,

    /// Narrow to a single trace.
    #[arg(long)]
    pub trace: Option<String>,

    /// Narrow to an interaction; takes precedence over `--trace`.
    #[arg(long)]
    pub interaction: Option<String>,

    /// Window start (ISO 8601 or relative, e.g. "2 hours ago").
    #[arg(long)]
    pub start: Option<String>,

    /// Window end (ISO 8601 or relative). Defaults to now.
    #[arg(long)]
    pub end: Option<String>,
}

/// Timeline rendering options.
#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Only show these event kinds (comma-separated).
    #[arg(long = "kind", value_delimiter = ',')]
    pub kinds: Vec<EventType>,

    /// Only show events whose name or id contains this text.
    #[arg(long)]
    pub search: Option<String>,
}

/// Query families the `query` command can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryKind {
    Traces,
    Logs,
    Exceptions,
    InteractionSpans,
}
