//! CLI subcommand implementations.

pub mod query;
pub mod timeline;
pub mod transform;
pub mod util;
