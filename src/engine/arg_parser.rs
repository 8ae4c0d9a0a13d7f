use clap::Parser;
use std::path::PathBuf;

/// Share a directory by content: index it, watch for requests, copy requested content out.
#[derive(Clone, Parser)]
#[command(name = "potluck")]
#[command(
    about = "Index a directory by SHA-256 and copy out content requested through a trigger directory."
)]
pub struct Cli {
    /// Directory to share (content root). Default: current directory.
    #[arg(long, short, value_name = "DIR")]
    pub share: Option<PathBuf>,

    /// Directory watched for requests; write to a file named by a hex digest to request it. Default: `coordination`.
    #[arg(long, short, value_name = "DIR")]
    pub trigger: Option<PathBuf>,

    /// Directory transferred files are written to, as `<digest><ext>`. Default: `transferred`.
    #[arg(long, short, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Path to a file-backed store. Default: in-memory store.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Seconds between indexing passes; 0 indexes once. Default: 5.
    #[arg(long, short, value_name = "SECS", value_parser = clap::value_parser!(u64))]
    pub period: Option<u64>,

    /// Number of transferer workers sharing the request channel. Default: 1.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub transferers: Option<usize>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Follow symbolic links while indexing.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Strict mode: stop on the first unreadable file or failed transfer instead of skipping it.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub strict: Option<bool>,

    /// Verbose output (debug logging, full index listing after each change).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Print the index stored in --db as JSON lines and exit.
    #[arg(long, short = 'l')]
    pub list: bool,
}
