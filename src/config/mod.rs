//! Application configuration assembled from CLI arguments and environment

use crate::cli::{Cli, TestMode};
use crate::defaults;
use crate::engine::{EngineSettings, ServerChoice, TestPlan};
use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub choice: ServerChoice,
    pub plan: TestPlan,
    pub settings: EngineSettings,
    pub history_file: PathBuf,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub export_only: bool,
    pub survey: bool,
    pub list_servers: bool,
    pub detect_location: bool,
    pub save_history: bool,
    pub enable_color: bool,
    pub verbose: bool,
    pub debug: bool,
}

/// Build and validate the configuration from parsed CLI arguments
///
/// Environment variables (including `.env` entries loaded at startup) are
/// applied by clap's `env` attributes before this runs; this step only
/// validates and assembles.
pub fn load_config(cli: Cli) -> Result<Config> {
    cli.validate().map_err(AppError::config)?;

    let choice = if cli.server == "auto" {
        ServerChoice::Auto
    } else {
        ServerChoice::Key(cli.server.clone())
    };

    let plan = match cli.mode {
        TestMode::Full => TestPlan::Full,
        TestMode::Ping => TestPlan::PingOnly,
        TestMode::Download => TestPlan::DownloadOnly,
        TestMode::Upload => TestPlan::UploadOnly,
    };

    let settings = EngineSettings {
        latency_probes: cli.count,
        probe_spacing: defaults::DEFAULT_PROBE_SPACING,
        download_duration: Duration::from_secs(cli.download_secs),
        upload_duration: Duration::from_secs(cli.upload_secs),
        download_streams: cli.streams,
        chunk_bytes: defaults::DEFAULT_CHUNK_BYTES,
        loss_probes: defaults::DEFAULT_LOSS_PROBES,
        loss_probe_timeout: defaults::DEFAULT_LOSS_PROBE_TIMEOUT,
    };

    let history_file = cli
        .history_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_HISTORY_FILE));

    let enable_color = cli.use_colors();

    Ok(Config {
        choice,
        plan,
        settings,
        history_file,
        export_csv: cli.export_csv,
        export_json: cli.export_json,
        report: cli.report,
        export_only: cli.export_only,
        survey: cli.survey,
        list_servers: cli.list_servers,
        detect_location: !cli.no_location,
        save_history: !cli.no_save,
        enable_color,
        verbose: cli.verbose,
        debug: cli.debug,
    })
}
