//! Tooling & Integration Layer
//!
//! The `agents` command-line front end and its output formatting.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands, ConfigCommands};
