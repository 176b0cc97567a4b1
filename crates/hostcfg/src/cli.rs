//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Host configuration agent: Windows Update
#[derive(Parser, Debug)]
#[command(name = "hostcfg", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search for updates and print them as JSON
    Search {
        /// Search query, defaults to the configured query
        #[arg(short, long)]
        query: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Download and install updates
    Install {
        /// Search query, defaults to the configured query
        #[arg(short, long)]
        query: Option<String>,

        /// Only install these update ids (repeatable)
        #[arg(long = "update-id")]
        update_ids: Vec<String>,

        /// Print the selection without installing
        #[arg(long)]
        dry_run: bool,
    },

    /// Report whether a reboot is pending
    #[command(name = "reboot-required")]
    RebootRequired,

    /// Print the effective configuration
    Config,
}
