use std::path::PathBuf;

use clap::Parser;

use super::logging::LogDestination;

/// Command-line flags. Every value except `--config` and `--list-formats`
/// may also come from the config file; flags win.
#[derive(Debug, Default, Parser)]
#[command(name = "convert")]
#[command(about = "Submit media conversion jobs and follow them to completion", version)]
pub struct Cli {
    /// Conversion service root (default: http://127.0.0.1:5000)
    #[arg(long)]
    pub server: Option<String>,

    /// Media reference to convert, usually a video URL
    #[arg(long)]
    pub source: Option<String>,

    /// Format to convert to; repeat to run several jobs side by side
    #[arg(long = "format", short = 'f')]
    pub formats: Vec<String>,

    /// Requested artifact name; the service sanitizes it
    #[arg(long)]
    pub output_name: Option<String>,

    /// Anti-automation proof obtained before submitting
    #[arg(long)]
    pub verification_token: Option<String>,

    /// Session token sent as X-CSRFToken
    #[arg(long)]
    pub session_token: Option<String>,

    /// Pause between a status response and the next query
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Give up on a job after this many status queries
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Per-request timeout for service calls
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Download finished artifacts into this directory
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Where log output goes
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// RON file with defaults for the flags above
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Print the formats available for the source and exit
    #[arg(long)]
    pub list_formats: bool,
}
