//! CLI definitions for caseprobe.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// caseprobe CLI.
#[derive(Parser, Debug)]
#[command(name = "caseprobe")]
#[command(about = "Finds a case record in the portal's work lists and exports what it shows")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        env = "CASEPROBE_CONFIG",
        default_value = "config/caseprobe.toml",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Look up one identifier and print the result as JSON
    Run {
        /// Case identifier, e.g. GK.6640.123.2024
        identifier: String,

        /// Portal key in portals.json
        #[arg(short, long, env = "CASEPROBE_PORTAL")]
        portal: String,

        /// Screenshot every completed step
        #[arg(long)]
        debug: bool,

        /// Run Chrome without a window
        #[arg(long)]
        headless: bool,
    },

    /// Session directory maintenance
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum SessionsAction {
    /// Remove session folders older than the retention window
    Clean {
        /// Overrides runtime.session_retention_days
        #[arg(long)]
        max_age_days: Option<u32>,
    },

    /// Remove every session folder
    Clear,
}
