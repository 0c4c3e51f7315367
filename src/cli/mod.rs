//! CLI module for sqlroute
//!
//! Provides command-line interface for:
//! - serve: load configuration and enter the serving loop
//! - check: validate a configuration file and exit
//! - parse: one-shot template parse for development

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check, parse, run, run_command, serve};
pub use errors::{CliError, CliResult};
