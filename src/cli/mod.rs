//! Command-line interface for adforge.
//!
//! Provides the pipeline invocation plus dead-letter and document store
//! maintenance commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
