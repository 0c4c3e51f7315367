//! CLI argument definitions using clap
//!
//! Commands:
//! - sqlroute serve --config <path> [--port <port>]
//! - sqlroute check --config <path>
//! - sqlroute parse --template <sql> [--param k=v ...]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sqlroute - stored SQL templates behind configurable HTTP endpoints
#[derive(Parser, Debug)]
#[command(name = "sqlroute")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the endpoint server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./sqlroute.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a configuration file and exit
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./sqlroute.json")]
        config: PathBuf,
    },

    /// Parse a template against parameters and print the bound statement
    Parse {
        /// Template text
        #[arg(long)]
        template: String,

        /// Parameters as name=value pairs, repeatable
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
