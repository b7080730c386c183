//! Supplementary diagnostics: DNS/connection timing proxies and packet loss
//!
//! All three measurements are best-effort. Any individual failure leaves the
//! corresponding field unmeasured; diagnostics never abort the test run.

use crate::client::{ProbeClient, ProbeRequest};
use crate::engine::progress::{ProgressEvent, ProgressObserver, Stage};
use crate::registry::ProbeTarget;
use crate::stats::{loss_percentage, round_ms};
use std::time::Duration;

/// Result of the diagnostics pass; every field may be unmeasured
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiagnosticsReport {
    /// Elapsed time of a single HEAD request, as a DNS-resolution proxy
    pub dns_ms: Option<u32>,
    /// Elapsed time of a single full GET request, as a connection-time proxy
    pub connection_ms: Option<u32>,
    /// Failed fraction of the reliability probe burst, as a percentage
    pub packet_loss_pct: Option<f64>,
}

/// Runs the three one-shot diagnostic measurements
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics {
    /// Probe count for the reliability burst
    pub loss_probes: u32,
    /// Per-probe timeout inside the reliability burst
    pub loss_probe_timeout: Duration,
}

impl Diagnostics {
    pub fn new(loss_probes: u32, loss_probe_timeout: Duration) -> Self {
        Self {
            loss_probes,
            loss_probe_timeout,
        }
    }

    pub async fn run(
        &self,
        prober: &dyn ProbeClient,
        target: &ProbeTarget,
        progress: &dyn ProgressObserver,
    ) -> DiagnosticsReport {
        let mut report = DiagnosticsReport::default();

        let dns_probe = prober.probe(ProbeRequest::head(target.echo_url())).await;
        if dns_probe.success {
            report.dns_ms = Some(round_ms(dns_probe.elapsed_ms()));
        }
        progress.on_event(ProgressEvent::StageProgress {
            stage: Stage::Diagnostics,
            fraction: 0.2,
        });

        let connection_probe = prober.probe(ProbeRequest::get(target.echo_url())).await;
        if connection_probe.success {
            report.connection_ms = Some(round_ms(connection_probe.elapsed_ms()));
        }

        report.packet_loss_pct = self.measure_loss(prober, target, progress).await;

        report
    }

    /// Reliability burst: a fixed count of HEAD probes, each individually
    /// timed out. The loss percentage is defined even when every probe fails.
    async fn measure_loss(
        &self,
        prober: &dyn ProbeClient,
        target: &ProbeTarget,
        progress: &dyn ProgressObserver,
    ) -> Option<f64> {
        if self.loss_probes == 0 {
            return None;
        }

        let mut failed = 0u32;
        for i in 0..self.loss_probes {
            let request =
                ProbeRequest::head(target.echo_url()).with_timeout(self.loss_probe_timeout);
            let outcome = prober.probe(request).await;
            if !outcome.success {
                failed += 1;
            }
            progress.on_event(ProgressEvent::StageProgress {
                stage: Stage::Diagnostics,
                fraction: 0.4 + 0.6 * ((i + 1) as f64 / self.loss_probes as f64),
            });
        }

        Some(loss_percentage(failed, self.loss_probes))
    }
}
