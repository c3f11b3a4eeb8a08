//! Session timeline CLI library.
//!
//! This crate provides the CLI interface over `tl-core` and `tl-client`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, OutputArgs, QueryKind, SubjectArgs};
pub use config::Config;
