//! Command-line interface definition

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which measured stages to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestMode {
    /// Latency, download, upload and diagnostics
    Full,
    /// Latency and diagnostics only
    Ping,
    /// Download and diagnostics only
    Download,
    /// Upload and diagnostics only
    Upload,
}

/// Network Speed Tester - measure latency, jitter, throughput and packet loss
#[derive(Parser, Debug, Clone)]
#[command(name = "nst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Endpoint key to test against, or "auto" to pick the fastest
    #[arg(short, long, default_value = "auto")]
    pub server: String,

    /// Which stages to run
    #[arg(short, long, value_enum, default_value_t = TestMode::Full)]
    pub mode: TestMode,

    /// Ping every registry endpoint and print a ranking table instead of testing
    #[arg(long)]
    pub survey: bool,

    /// List the available endpoint keys and exit
    #[arg(long)]
    pub list_servers: bool,

    /// Number of latency probes
    #[arg(short, long, env = "NST_LATENCY_PROBES", default_value_t = crate::defaults::DEFAULT_LATENCY_PROBES)]
    pub count: u32,

    /// Download stage duration in seconds
    #[arg(long, env = "NST_DOWNLOAD_SECS", default_value_t = crate::defaults::DEFAULT_DOWNLOAD_DURATION.as_secs())]
    pub download_secs: u64,

    /// Upload stage duration in seconds
    #[arg(long, env = "NST_UPLOAD_SECS", default_value_t = crate::defaults::DEFAULT_UPLOAD_DURATION.as_secs())]
    pub upload_secs: u64,

    /// Concurrent download streams
    #[arg(long, env = "NST_STREAMS", default_value_t = crate::defaults::DEFAULT_DOWNLOAD_STREAMS)]
    pub streams: u32,

    /// Write the accumulated history as CSV to this path
    #[arg(long, value_name = "PATH")]
    pub export_csv: Option<PathBuf>,

    /// Write the accumulated history as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Write a detailed text report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Only export/report from saved history, without running a test
    #[arg(long)]
    pub export_only: bool,

    /// History file location
    #[arg(long, env = "NST_HISTORY_FILE", value_name = "PATH")]
    pub history_file: Option<PathBuf>,

    /// Skip client IP/location detection
    #[arg(long)]
    pub no_location: bool,

    /// Do not save this run to the history file
    #[arg(long)]
    pub no_save: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.count == 0 {
            return Err("--count must be at least 1".to_string());
        }

        if self.streams == 0 {
            return Err("--streams must be at least 1".to_string());
        }

        if self.download_secs == 0 || self.upload_secs == 0 {
            return Err("Stage durations must be at least 1 second".to_string());
        }

        if self.export_only
            && self.export_csv.is_none()
            && self.export_json.is_none()
            && self.report.is_none()
        {
            return Err(
                "--export-only requires --export-csv, --export-json or --report".to_string(),
            );
        }

        if self.survey && self.export_only {
            return Err("--survey and --export-only are mutually exclusive".to_string());
        }

        if self.survey
            && (self.export_csv.is_some() || self.export_json.is_some() || self.report.is_some())
        {
            return Err(
                "--survey does not produce exportable results; remove the export flags".to_string(),
            );
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

/// Automatic color detection honoring NO_COLOR and dumb terminals
fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    match std::env::var("TERM") {
        Ok(term) => term != "dumb",
        Err(_) => crate::defaults::DEFAULT_ENABLE_COLOR,
    }
}
