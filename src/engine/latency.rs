//! Latency sampling: serial lightweight probes aggregated into ping and jitter

use crate::client::{ProbeClient, ProbeRequest};
use crate::engine::progress::{ProgressEvent, ProgressObserver};
use crate::registry::ProbeTarget;
use crate::stats::{mean, population_std_dev, round_ms};
use std::time::Duration;
use tokio::time::sleep;

/// Aggregated latency statistics for one sampling pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    /// Mean round-trip time, rounded to the nearest millisecond
    pub ping_ms: u32,
    /// Population standard deviation about the mean, rounded to the nearest
    /// millisecond
    pub jitter_ms: u32,
    /// Number of successful probes the statistics are based on
    pub samples: usize,
}

/// Repeats HEAD probes against one target and aggregates the round trips
#[derive(Debug, Clone, Copy)]
pub struct LatencySampler {
    /// Number of probes to issue
    pub probes: u32,
    /// Delay between consecutive probes, to avoid bursty self-interference
    pub spacing: Duration,
}

impl LatencySampler {
    pub fn new(probes: u32, spacing: Duration) -> Self {
        Self { probes, spacing }
    }

    /// Run the sampling pass. Failed probes are dropped from the sample set
    /// (no retry, no penalty). Returns `None` when zero probes succeed, so
    /// callers get an explicit "no data" state instead of a NaN mean.
    pub async fn measure(
        &self,
        prober: &dyn ProbeClient,
        target: &ProbeTarget,
        progress: &dyn ProgressObserver,
    ) -> Option<LatencyStats> {
        let mut samples: Vec<f64> = Vec::with_capacity(self.probes as usize);

        for i in 0..self.probes {
            let outcome = prober.probe(ProbeRequest::head(target.echo_url())).await;

            if outcome.success {
                samples.push(outcome.elapsed_ms());
                progress.on_event(ProgressEvent::LatencySample {
                    sample_ms: round_ms(outcome.elapsed_ms()),
                    completed: samples.len() as u32,
                    total: self.probes,
                });
            }

            if i + 1 < self.probes {
                sleep(self.spacing).await;
            }
        }

        let avg = mean(&samples)?;
        let jitter = population_std_dev(&samples)?;

        Some(LatencyStats {
            ping_ms: round_ms(avg),
            jitter_ms: round_ms(jitter),
            samples: samples.len(),
        })
    }
}
