use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bankctl")]
#[command(about = "Audit and repair rows of a hosted exam-problem bank", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Report rows whose property is empty or absent.
    Missing {
        /// Property name to check
        #[arg(short, long)]
        property: String,
        /// Output the JSON report instead of console lines
        #[arg(long)]
        json: bool,
    },

    /// List rows whose property contains a substring (server-side filter).
    Find {
        /// Property name to match against
        #[arg(short, long)]
        property: String,
        /// Substring the property's text must contain
        #[arg(short, long)]
        contains: String,
        #[arg(long)]
        json: bool,
    },

    /// Report property values shared by more than one row.
    Dupes {
        /// Property name to group by
        #[arg(short, long)]
        property: String,
        #[arg(long)]
        json: bool,
    },

    /// Scan text properties for LaTeX defects (braces, $ delimiters, \left/\right).
    Latex {
        /// Properties to scan (repeatable). Default: Statement, Answer, Solution
        #[arg(short, long = "property")]
        properties: Vec<String>,
        #[arg(long)]
        json: bool,
    },

    /// Validate that a text property holds parseable JSON.
    Json {
        /// Property name holding the JSON document
        #[arg(short, long)]
        property: String,
        #[arg(long)]
        json: bool,
    },

    /// Fetch one row by id and print its property map.
    Show {
        /// Row id
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Fill a default value into every row where the property is empty.
    Fill {
        #[arg(short, long)]
        property: String,
        /// Value to write; coerced to the property's kind
        #[arg(short, long)]
        value: String,
        /// Checkpoint file path
        #[arg(long, default_value = "progress.json")]
        progress_file: PathBuf,
        /// Resume from the checkpoint file instead of starting over
        #[arg(long)]
        resume: bool,
        /// Report intended patches without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Rewrite one select option value to another across matching rows.
    Retag {
        #[arg(short, long)]
        property: String,
        /// Option value to replace
        #[arg(long)]
        from: String,
        /// Replacement option value
        #[arg(long)]
        to: String,
        /// Checkpoint file path
        #[arg(long, default_value = "progress.json")]
        progress_file: PathBuf,
        /// Resume from the checkpoint file instead of starting over
        #[arg(long)]
        resume: bool,
        /// Report intended patches without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Archive (soft-delete) one row by id, or every row missing a property.
    Archive {
        /// Row id to archive
        #[arg(long)]
        id: Option<String>,
        /// Archive all rows where this property is empty
        #[arg(long)]
        where_empty: Option<String>,
        /// Report intended archives without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the status report derived from a checkpoint file.
    Status {
        #[arg(long, default_value = "progress.json")]
        progress_file: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Find CSV files under a directory and flag duplicate contents.
    FindCsv {
        /// Directory to scan
        #[arg(short, long)]
        root: PathBuf,
        /// Only report files whose name contains this substring
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Serve static files and proxy /api/ requests to the bank with auth injected.
    Serve {
        /// Directory to serve files from
        #[arg(short, long)]
        root: PathBuf,
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        #[arg(short, long, default_value_t = 8787)]
        port: u16,
    },
}
