//! Throughput sampling: timed transfer loops accumulating transferred bytes
//!
//! Download and upload share the same shape: issue chunk requests until a
//! wall-clock budget elapses, accumulating bytes into a shared monotonic
//! counter. Download fans out over several logically-concurrent streams that
//! race the same deadline; upload runs a single stream posting a fixed-size
//! pseudorandom payload.

use crate::client::{ProbeClient, ProbeRequest};
use crate::engine::progress::{ProgressEvent, ProgressObserver, Stage};
use crate::registry::ProbeTarget;
use crate::stats::mbps;
use futures::future::join_all;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Result of one timed throughput stage
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputStats {
    /// Final bitrate over the full measured duration
    pub mbps: f64,
    /// Total bytes across all streams
    pub total_bytes: u64,
    /// Wall-clock time actually spent in the stage
    pub elapsed: Duration,
    /// Per-stream byte counts, in stream order
    pub stream_bytes: Vec<u64>,
}

impl ThroughputStats {
    /// Whether the stage transferred anything at all
    pub fn measured(&self) -> bool {
        self.total_bytes > 0
    }
}

/// Timed transfer loop runner
#[derive(Debug, Clone, Copy)]
pub struct ThroughputSampler {
    /// Wall-clock budget for the stage
    pub duration: Duration,
    /// Concurrent stream count for downloads
    pub streams: u32,
    /// Requested chunk size per transfer
    pub chunk_bytes: u64,
}

impl ThroughputSampler {
    pub fn new(duration: Duration, streams: u32, chunk_bytes: u64) -> Self {
        Self {
            duration,
            streams,
            chunk_bytes,
        }
    }

    /// Download stage: `streams` concurrent loops against the same target,
    /// each independently fetching chunks until the shared budget elapses.
    /// All streams are joined (wait-for-all); a failed chunk ends only the
    /// stream it happened on.
    pub async fn measure_download(
        &self,
        prober: &dyn ProbeClient,
        target: &ProbeTarget,
        progress: &dyn ProgressObserver,
    ) -> ThroughputStats {
        let total = AtomicU64::new(0);
        let start = Instant::now();

        let streams = (0..self.streams)
            .map(|_| self.download_stream(prober, target, &total, start, progress))
            .collect::<Vec<_>>();

        let stream_bytes = join_all(streams).await;
        self.finish(&total, start, stream_bytes)
    }

    /// Upload stage: a single stream posting a fixed-size payload until the
    /// budget elapses. The payload is randomized per byte so compression on
    /// the path cannot inflate the apparent bitrate.
    pub async fn measure_upload(
        &self,
        prober: &dyn ProbeClient,
        target: &ProbeTarget,
        progress: &dyn ProgressObserver,
    ) -> ThroughputStats {
        let mut payload = vec![0u8; self.chunk_bytes as usize];
        rand::thread_rng().fill_bytes(&mut payload);

        let total = AtomicU64::new(0);
        let start = Instant::now();
        let mut local: u64 = 0;

        while start.elapsed() < self.duration {
            let request = ProbeRequest::post(target.upload_url(), payload.clone());
            let outcome = prober.probe(request).await;

            if !outcome.success {
                break;
            }

            local += outcome.bytes;
            self.report_chunk(Stage::Upload, &total, outcome.bytes, start, progress);
        }

        self.finish(&total, start, vec![local])
    }

    async fn download_stream(
        &self,
        prober: &dyn ProbeClient,
        target: &ProbeTarget,
        total: &AtomicU64,
        start: Instant,
        progress: &dyn ProgressObserver,
    ) -> u64 {
        let mut local: u64 = 0;

        while start.elapsed() < self.duration {
            let request = ProbeRequest::get(target.download_url(self.chunk_bytes));
            let outcome = prober.probe(request).await;

            if !outcome.success {
                // End of budget for this stream only; siblings keep racing
                break;
            }

            local += outcome.bytes;
            self.report_chunk(Stage::Download, total, outcome.bytes, start, progress);
        }

        local
    }

    fn report_chunk(
        &self,
        stage: Stage,
        total: &AtomicU64,
        bytes: u64,
        start: Instant,
        progress: &dyn ProgressObserver,
    ) {
        // fetch_add keeps the accumulator consistent across overlapping
        // stream completions; the returned previous value gives this
        // chunk's cumulative position without a second load
        let cumulative = total.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let elapsed = start.elapsed();

        progress.on_event(ProgressEvent::Throughput {
            stage,
            mbps: mbps(cumulative, elapsed.as_secs_f64()),
            total_bytes: cumulative,
            fraction: elapsed.as_secs_f64() / self.duration.as_secs_f64(),
        });
    }

    fn finish(&self, total: &AtomicU64, start: Instant, stream_bytes: Vec<u64>) -> ThroughputStats {
        let elapsed = start.elapsed();
        let total_bytes = total.load(Ordering::Relaxed);

        ThroughputStats {
            mbps: mbps(total_bytes, elapsed.as_secs_f64()),
            total_bytes,
            elapsed,
            stream_bytes,
        }
    }
}
