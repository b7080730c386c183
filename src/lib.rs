//! Network Speed Tester
//!
//! A network speed testing tool that measures latency, jitter, download and
//! upload throughput, and packet loss against a fixed registry of international
//! test endpoints, with CSV/JSON/text export of accumulated results.

pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod models;
pub mod output;
pub mod registry;
pub mod stats;

// Re-export commonly used types
pub use client::{HttpProber, ProbeClient, ProbeOutcome, ProbeRequest};
pub use engine::{
    EngineSettings, ProgressEvent, ProgressObserver, RunState, ServerChoice, SpeedTestSession,
    Stage, TestPlan,
};
pub use error::{AppError, Result};
pub use models::{History, HistoryStore, MeasurementRecord};
pub use registry::{Endpoint, EndpointRegistry, ProbeTarget};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Number of probes in the latency sampling pass
    pub const DEFAULT_LATENCY_PROBES: u32 = 10;
    /// Delay between consecutive latency probes
    pub const DEFAULT_PROBE_SPACING: Duration = Duration::from_millis(100);
    /// Wall-clock budget for the download stage
    pub const DEFAULT_DOWNLOAD_DURATION: Duration = Duration::from_secs(10);
    /// Wall-clock budget for the upload stage
    pub const DEFAULT_UPLOAD_DURATION: Duration = Duration::from_secs(8);
    /// Number of concurrent download streams
    pub const DEFAULT_DOWNLOAD_STREAMS: u32 = 4;
    /// Transfer chunk size (1 MiB, matching the /bytes/{n} request size)
    pub const DEFAULT_CHUNK_BYTES: u64 = 1_048_576;
    /// Probe count for the packet-loss diagnostic
    pub const DEFAULT_LOSS_PROBES: u32 = 10;
    /// Per-probe timeout inside the packet-loss diagnostic
    pub const DEFAULT_LOSS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    /// History file written when no path is configured
    pub const DEFAULT_HISTORY_FILE: &str = "speed-test-history.json";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
