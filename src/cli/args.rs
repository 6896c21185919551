//! CLI argument definitions using clap
//!
//! Commands:
//! - txserve serve --config <path> [--seed-users <n>] [--seed-orders <n>]
//! - txserve check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// txserve - transactional CRUD backend with supervised HTTP and gRPC units
#[derive(Parser, Debug)]
#[command(name = "txserve")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP and gRPC servers and run until signalled
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./txserve.json")]
        config: PathBuf,

        /// Insert this many sample users before serving
        #[arg(long, default_value_t = 0)]
        seed_users: usize,

        /// Top the orders table up to this many rows before serving
        #[arg(long, default_value_t = 0)]
        seed_orders: usize,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./txserve.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
