//! CLI module for txserve
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP and gRPC units until signalled
//! - check-config: Validate a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
