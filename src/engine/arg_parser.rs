use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Batch task pipeline: convert an image tree to AVIF or download a URL list, in bounded batches.
#[derive(Clone, Parser)]
#[command(name = "bulkshift", version)]
#[command(about = "Convert image trees to AVIF or download URL lists in bounded, resumable batches.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Re-encode every jpg/jpeg/png/webp under INPUT as AVIF under OUTPUT (same relative layout).
    Convert(ConvertArgs),
    /// Download every URL in LIST (text, one per line, or a JSON array) under OUTPUT.
    Download(DownloadArgs),
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Convert(a) => &a.common,
            Commands::Download(a) => &a.common,
        }
    }
}

/// Flags shared by every subcommand. Unset flags fall back to the config file, then to defaults.
#[derive(Clone, Args)]
pub struct CommonArgs {
    /// Items per batch (at least 1).
    #[arg(long, short = 'b')]
    pub batch_size: Option<usize>,

    /// Concurrent items within a batch. Default: batch size.
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,

    /// Pause between batches in milliseconds.
    #[arg(long)]
    pub pause_ms: Option<u64>,

    /// Skip items whose output already exists (default true; pass `--skip-existing false` to redo all).
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub skip_existing: Option<bool>,

    /// Append one line per failed item to this file.
    #[arg(long, short = 'l')]
    pub error_log: Option<PathBuf>,

    /// Show a progress bar instead of a log line per batch.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Exit with status 2 when any item failed.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub fail_on_error: Option<bool>,

    /// Settings file. Default: `.bulkshift.toml` in the current directory, if present.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Args)]
pub struct ConvertArgs {
    /// Directory tree to convert.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where AVIF files are written.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,

    /// AVIF quality, 1-100.
    #[arg(long, short = 'q')]
    pub quality: Option<u8>,

    /// AVIF encoder speed, 0 (slowest) to 10 (fastest).
    #[arg(long, short = 's')]
    pub speed: Option<u8>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,
}

#[derive(Clone, Args)]
pub struct DownloadArgs {
    /// URL list: one URL per line (`#` comments allowed) or a `.json` array of strings.
    #[arg(value_name = "LIST")]
    pub list: PathBuf,

    /// Where downloads are written (sharded by the first two characters of the file name).
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Retries per URL for transient failures.
    #[arg(long, short = 'r')]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds.
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}
