//! Command-line arguments for the Market Client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;
use market_common::instruments::Instrument;
use market_common::net::{DEFAULT_PORT, addr};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Feed server address as `host:port`.
    #[clap(long, default_value_t = addr("127.0.0.1", DEFAULT_PORT))]
    pub server: String,

    /// Symbols to subscribe to, comma separated or repeated.
    #[clap(long, value_enum, value_delimiter = ',', ignore_case = true)]
    pub symbols: Vec<Instrument>,

    /// Path to a text file with more symbols to subscribe to.
    /// Symbols may be separated by commas, spaces, or new lines.
    #[clap(long)]
    pub path: Option<String>,
}
