use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tl_cli::commands::{query, timeline, transform, util};
use tl_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Query {
            subject,
            data_type,
            span_name,
        }) => {
            let scenario = util::resolve_scenario(subject)?;
            let time_range = util::resolve_window(
                subject.start.as_deref(),
                subject.end.as_deref(),
                config.lookback_hours,
                chrono::Utc::now(),
            )?;
            let request = query::build(&scenario, *data_type, span_name.as_deref(), time_range);
            query::run(&mut out, &request)?;
        }
        Some(Commands::Timeline { subject, output }) => {
            timeline::run(&mut out, &config, subject, output)?;
        }
        Some(Commands::Transform {
            input,
            session,
            output,
        }) => {
            transform::run(&mut out, input, session, output)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    out.flush()?;
    Ok(())
}
