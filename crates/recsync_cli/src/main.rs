//! recsync CLI
//!
//! Command-line tools for inspecting record diffs and merge plans.
//!
//! # Commands
//!
//! - `diff` - Show the attribute-level diff between two record files
//! - `plan` - Show the statements a merge of two record files would issue
//!
//! Record files are JSON arrays of objects; the schema file describes the
//! record type they hold (see [`schema`]).

mod commands;
mod schema;

use clap::{Parser, Subcommand};
use recsync_core::MergeOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// recsync record diff and merge tools.
#[derive(Parser)]
#[command(name = "recsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the diff between a past and a current record file
    Diff {
        /// Schema file describing the record type
        #[arg(short, long)]
        schema: PathBuf,

        /// Previously persisted records
        past: PathBuf,

        /// Desired records
        current: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the statements merging current over past would issue
    Plan {
        /// Schema file describing the record type
        #[arg(short, long)]
        schema: PathBuf,

        /// Previously persisted records
        past: PathBuf,

        /// Desired records
        current: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Maximum rows per insert statement
        #[arg(long, default_value = "500")]
        insert_batch_size: usize,

        /// Issue one update per record instead of one per change signature
        #[arg(long)]
        no_batch_updates: bool,

        /// Issue one delete per record
        #[arg(long)]
        no_batch_deletes: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Diff {
            schema,
            past,
            current,
            format,
        } => {
            commands::diff::run(&schema, &past, &current, &format)?;
        }
        Commands::Plan {
            schema,
            past,
            current,
            format,
            insert_batch_size,
            no_batch_updates,
            no_batch_deletes,
        } => {
            let options = MergeOptions::new()
                .insert_batch_size(insert_batch_size)
                .batch_updates(!no_batch_updates)
                .batch_deletes(!no_batch_deletes);
            commands::plan::run(&schema, &past, &current, options, &format)?;
        }
        Commands::Version => {
            println!("recsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("recsync Core v{}", recsync_core::VERSION);
        }
    }

    Ok(())
}
