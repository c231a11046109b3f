//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sitegraph content graph builder CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: sitegraph.toml)
    #[arg(short = 'C', long, default_value = "sitegraph.toml")]
    pub config: PathBuf,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Silence log output
    #[arg(short, long)]
    pub quiet: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run all plugin phases and write the route manifest
    Routes,

    /// Run all plugin phases and print the compiled schema
    Schema,

    /// Run all plugin phases and execute a GraphQL query
    Query {
        /// The query document
        doc: String,

        /// Query variables as a JSON object
        #[arg(short, long)]
        variables: Option<String>,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_routes(&self) -> bool {
        matches!(self.command, Commands::Routes)
    }
    pub const fn is_query(&self) -> bool {
        matches!(self.command, Commands::Query { .. })
    }
}
