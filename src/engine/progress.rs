//! Structured progress events emitted by the measurement engine
//!
//! Measurement stages never touch the terminal. They emit events through a
//! `ProgressObserver` and a presentation layer subscribes. Observers must be
//! safe to invoke from overlapping download-stream completions.

use crate::engine::selector::ServerRank;

/// Measurement stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SelectingServer,
    Latency,
    Download,
    Upload,
    Diagnostics,
}

impl Stage {
    /// Human-readable stage name
    pub fn name(&self) -> &'static str {
        match self {
            Stage::SelectingServer => "server selection",
            Stage::Latency => "latency",
            Stage::Download => "download",
            Stage::Upload => "upload",
            Stage::Diagnostics => "diagnostics",
        }
    }

    /// Overall-progress span (percent) occupied by this stage in a full run
    pub fn percent_span(&self) -> (f64, f64) {
        match self {
            Stage::SelectingServer => (0.0, 0.0),
            Stage::Latency => (0.0, 25.0),
            Stage::Download => (25.0, 60.0),
            Stage::Upload => (60.0, 90.0),
            Stage::Diagnostics => (90.0, 100.0),
        }
    }

    /// Map a within-stage fraction (0..=1) onto the overall percent scale
    pub fn overall_percent(&self, fraction: f64) -> f64 {
        let (lo, hi) = self.percent_span();
        lo + fraction.clamp(0.0, 1.0) * (hi - lo)
    }
}

/// One structured progress notification from the engine
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A stage began
    StageStarted { stage: Stage },
    /// A stage finished (successfully or after exhausting its budget)
    StageCompleted { stage: Stage },
    /// A latency probe completed successfully
    LatencySample {
        sample_ms: u32,
        /// Successful samples collected so far (failed probes don't count)
        completed: u32,
        total: u32,
    },
    /// A throughput chunk completed on one stream
    Throughput {
        stage: Stage,
        /// Running bitrate over all streams so far
        mbps: f64,
        /// Cumulative bytes over all streams
        total_bytes: u64,
        /// Elapsed fraction of the stage's wall-clock budget
        fraction: f64,
    },
    /// Generic within-stage progress for stages without a richer event
    StageProgress { stage: Stage, fraction: f64 },
    /// The server selector finished probing one registry entry
    ServerProbed {
        key: String,
        display_name: String,
        rank: ServerRank,
    },
    /// Free-form status line (location detection, save notices)
    Status { message: String },
    /// The run reached Completed
    RunCompleted,
    /// The run transitioned to Failed
    RunFailed { message: String },
}

/// Subscriber for engine progress
///
/// Implementations are invoked from concurrently completing download streams
/// and must therefore be `Send + Sync` and internally consistent without
/// blocking.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Observer that discards all events
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_event(&self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_spans_cover_full_run() {
        assert_eq!(Stage::Latency.percent_span().0, 0.0);
        assert_eq!(Stage::Diagnostics.percent_span().1, 100.0);
        // Stages tile the scale without gaps
        assert_eq!(Stage::Latency.percent_span().1, Stage::Download.percent_span().0);
        assert_eq!(Stage::Download.percent_span().1, Stage::Upload.percent_span().0);
        assert_eq!(Stage::Upload.percent_span().1, Stage::Diagnostics.percent_span().0);
    }

    #[test]
    fn test_overall_percent_mapping() {
        assert_eq!(Stage::Latency.overall_percent(0.0), 0.0);
        assert_eq!(Stage::Latency.overall_percent(1.0), 25.0);
        assert_eq!(Stage::Download.overall_percent(0.5), 42.5);
        // Out-of-range fractions clamp
        assert_eq!(Stage::Upload.overall_percent(1.5), 90.0);
        assert_eq!(Stage::Upload.overall_percent(-1.0), 60.0);
    }
}
