//! Measurement engine: session state machine and stage orchestration
//!
//! A `SpeedTestSession` owns the endpoint registry, the prober, the
//! accumulated history and an explicit run state. One run executes the stages
//! strictly in sequence (server selection when requested, then latency,
//! download, upload, diagnostics), accumulating a single `MeasurementRecord`
//! that is handed to the history on completion.

pub mod diagnostics;
pub mod latency;
pub mod progress;
pub mod selector;
pub mod throughput;

pub use diagnostics::{Diagnostics, DiagnosticsReport};
pub use latency::{LatencySampler, LatencyStats};
pub use progress::{NullObserver, ProgressEvent, ProgressObserver, Stage};
pub use selector::{ServerRank, ServerSelector};
pub use throughput::{ThroughputSampler, ThroughputStats};

use crate::client::ProbeClient;
use crate::defaults;
use crate::error::{AppError, Result};
use crate::models::{ClientInfo, History, MeasurementRecord};
use crate::registry::{Endpoint, EndpointRegistry, ProbeTarget};
use std::sync::Arc;
use std::time::Duration;

/// Tunable measurement parameters
///
/// Production runs use the defaults; tests shrink the budgets and chunk size
/// so a full run finishes in milliseconds against a local mock server.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub latency_probes: u32,
    pub probe_spacing: Duration,
    pub download_duration: Duration,
    pub upload_duration: Duration,
    pub download_streams: u32,
    pub chunk_bytes: u64,
    pub loss_probes: u32,
    pub loss_probe_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            latency_probes: defaults::DEFAULT_LATENCY_PROBES,
            probe_spacing: defaults::DEFAULT_PROBE_SPACING,
            download_duration: defaults::DEFAULT_DOWNLOAD_DURATION,
            upload_duration: defaults::DEFAULT_UPLOAD_DURATION,
            download_streams: defaults::DEFAULT_DOWNLOAD_STREAMS,
            chunk_bytes: defaults::DEFAULT_CHUNK_BYTES,
            loss_probes: defaults::DEFAULT_LOSS_PROBES,
            loss_probe_timeout: defaults::DEFAULT_LOSS_PROBE_TIMEOUT,
        }
    }
}

/// Explicit run state; "is a test running" is this field, not an ambient flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    SelectingServer,
    MeasuringLatency,
    MeasuringDownload,
    MeasuringUpload,
    RunningDiagnostics,
    Completed,
    Failed,
}

impl RunState {
    /// Whether a run is currently in flight
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::SelectingServer
                | RunState::MeasuringLatency
                | RunState::MeasuringDownload
                | RunState::MeasuringUpload
                | RunState::RunningDiagnostics
        )
    }
}

/// Which measured stages a run executes; diagnostics always run afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPlan {
    Full,
    PingOnly,
    DownloadOnly,
    UploadOnly,
}

impl TestPlan {
    pub fn includes_latency(&self) -> bool {
        matches!(self, TestPlan::Full | TestPlan::PingOnly)
    }

    pub fn includes_download(&self) -> bool {
        matches!(self, TestPlan::Full | TestPlan::DownloadOnly)
    }

    pub fn includes_upload(&self) -> bool {
        matches!(self, TestPlan::Full | TestPlan::UploadOnly)
    }
}

/// How the run picks its endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerChoice {
    /// Rank the whole registry and use the fastest endpoint
    Auto,
    /// Use the endpoint registered under this key
    Key(String),
}

/// One measurement session: registry, prober, history and run state
pub struct SpeedTestSession {
    registry: EndpointRegistry,
    prober: Arc<dyn ProbeClient>,
    settings: EngineSettings,
    state: RunState,
    history: History,
    client_info: ClientInfo,
}

impl SpeedTestSession {
    pub fn new(
        registry: EndpointRegistry,
        prober: Arc<dyn ProbeClient>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            prober,
            settings,
            state: RunState::Idle,
            history: History::new(),
            client_info: ClientInfo::default(),
        }
    }

    /// Seed the session with previously persisted history
    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    /// Attach detected client identity/location, copied into each record
    pub fn set_client_info(&mut self, info: ClientInfo) {
        self.client_info = info;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Execute one test run. Rejected outright if a run is already active.
    /// Per-probe failures are tolerated inside the samplers; a stage-level
    /// failure transitions the session to `Failed` and skips the remaining
    /// stages. On success the finished record is appended to the history and
    /// a copy is returned.
    pub async fn run(
        &mut self,
        choice: ServerChoice,
        plan: TestPlan,
        progress: &dyn ProgressObserver,
    ) -> Result<MeasurementRecord> {
        if self.state.is_active() {
            return Err(AppError::TestInProgress);
        }

        match self.run_stages(choice, plan, progress).await {
            Ok(record) => {
                self.state = RunState::Completed;
                self.history.append(record.clone());
                progress.on_event(ProgressEvent::RunCompleted);
                Ok(record)
            }
            Err(e) => {
                self.state = RunState::Failed;
                progress.on_event(ProgressEvent::RunFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Probe every registry entry once and return the ranking table; used by
    /// survey mode. Does not create a measurement record.
    pub async fn survey(
        &self,
        progress: &dyn ProgressObserver,
    ) -> Vec<(Endpoint, ServerRank)> {
        ServerSelector::rank_all(self.prober.as_ref(), &self.registry, progress).await
    }

    async fn run_stages(
        &mut self,
        choice: ServerChoice,
        plan: TestPlan,
        progress: &dyn ProgressObserver,
    ) -> Result<MeasurementRecord> {
        let endpoint = self.pick_endpoint(choice, progress).await?;
        let target = endpoint.target()?;

        let mut record = MeasurementRecord::new(&endpoint.key, &endpoint.display_name);
        record.client = self.client_info.clone();

        if plan.includes_latency() {
            self.state = RunState::MeasuringLatency;
            progress.on_event(ProgressEvent::StageStarted { stage: Stage::Latency });

            let sampler =
                LatencySampler::new(self.settings.latency_probes, self.settings.probe_spacing);
            if let Some(stats) = sampler.measure(self.prober.as_ref(), &target, progress).await {
                record.ping_ms = Some(stats.ping_ms);
                record.jitter_ms = Some(stats.jitter_ms);
            }

            progress.on_event(ProgressEvent::StageCompleted { stage: Stage::Latency });
        }

        if plan.includes_download() {
            self.state = RunState::MeasuringDownload;
            progress.on_event(ProgressEvent::StageStarted { stage: Stage::Download });

            let sampler = ThroughputSampler::new(
                self.settings.download_duration,
                self.settings.download_streams,
                self.settings.chunk_bytes,
            );
            let stats = sampler
                .measure_download(self.prober.as_ref(), &target, progress)
                .await;
            if stats.measured() {
                record.download_mbps = Some(stats.mbps);
            }

            progress.on_event(ProgressEvent::StageCompleted { stage: Stage::Download });
        }

        if plan.includes_upload() {
            self.state = RunState::MeasuringUpload;
            progress.on_event(ProgressEvent::StageStarted { stage: Stage::Upload });

            let sampler = ThroughputSampler::new(
                self.settings.upload_duration,
                1,
                self.settings.chunk_bytes,
            );
            let stats = sampler
                .measure_upload(self.prober.as_ref(), &target, progress)
                .await;
            if stats.measured() {
                record.upload_mbps = Some(stats.mbps);
            }

            progress.on_event(ProgressEvent::StageCompleted { stage: Stage::Upload });
        }

        self.state = RunState::RunningDiagnostics;
        progress.on_event(ProgressEvent::StageStarted { stage: Stage::Diagnostics });

        let diagnostics =
            Diagnostics::new(self.settings.loss_probes, self.settings.loss_probe_timeout);
        let report = diagnostics
            .run(self.prober.as_ref(), &target, progress)
            .await;
        record.dns_ms = report.dns_ms;
        record.connection_ms = report.connection_ms;
        record.packet_loss_pct = report.packet_loss_pct;

        progress.on_event(ProgressEvent::StageCompleted { stage: Stage::Diagnostics });

        Ok(record)
    }

    async fn pick_endpoint(
        &mut self,
        choice: ServerChoice,
        progress: &dyn ProgressObserver,
    ) -> Result<Endpoint> {
        match choice {
            ServerChoice::Key(key) => self
                .registry
                .get(&key)
                .cloned()
                .ok_or_else(|| AppError::validation(format!("Unknown server key: {}", key))),
            ServerChoice::Auto => {
                self.state = RunState::SelectingServer;
                progress.on_event(ProgressEvent::StageStarted {
                    stage: Stage::SelectingServer,
                });

                let best =
                    ServerSelector::select_best(self.prober.as_ref(), &self.registry, progress)
                        .await
                        .ok_or_else(|| {
                            AppError::test_execution("Server selection failed: registry is empty")
                        })?;

                progress.on_event(ProgressEvent::StageCompleted {
                    stage: Stage::SelectingServer,
                });
                Ok(best.0)
            }
        }
    }

    /// Resolve the probe target for a configured endpoint key without running
    pub fn target_for(&self, key: &str) -> Result<ProbeTarget> {
        self.registry
            .get(key)
            .ok_or_else(|| AppError::validation(format!("Unknown server key: {}", key)))?
            .target()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{failed_outcome, ok_outcome, ok_transfer, FnProber};
    use super::*;
    use crate::client::ProbeRequest;
    use reqwest::Method;

    fn test_registry() -> EndpointRegistry {
        let entry = |key: &str, host: &str| Endpoint {
            key: key.to_string(),
            display_name: format!("Server {}", key),
            primary_host: host.to_string(),
            backup_host: host.to_string(),
            location: "Test".to_string(),
        };
        EndpointRegistry::new(vec![
            entry("alpha", "alpha.example.com"),
            entry("beta", "beta.example.com"),
        ])
    }

    fn fast_settings() -> EngineSettings {
        EngineSettings {
            latency_probes: 3,
            probe_spacing: Duration::ZERO,
            download_duration: Duration::from_millis(30),
            upload_duration: Duration::from_millis(30),
            download_streams: 2,
            chunk_bytes: 4096,
            loss_probes: 4,
            loss_probe_timeout: Duration::from_secs(1),
        }
    }

    fn healthy_prober() -> Arc<dyn ProbeClient> {
        Arc::new(FnProber::new(|req: &ProbeRequest| match req.method {
            Method::GET => ok_transfer(2, 4096),
            Method::POST => ok_transfer(2, req.body.as_ref().map(|b| b.len() as u64).unwrap_or(0)),
            _ => ok_outcome(10),
        }))
    }

    #[tokio::test]
    async fn test_full_run_populates_record() {
        let mut session =
            SpeedTestSession::new(test_registry(), healthy_prober(), fast_settings());

        let record = session
            .run(
                ServerChoice::Key("alpha".to_string()),
                TestPlan::Full,
                &NullObserver,
            )
            .await
            .unwrap();

        assert_eq!(record.server_key, "alpha");
        assert_eq!(record.ping_ms, Some(10));
        assert_eq!(record.jitter_ms, Some(0));
        assert!(record.download_mbps.unwrap() > 0.0);
        assert!(record.upload_mbps.unwrap() > 0.0);
        assert_eq!(record.packet_loss_pct, Some(0.0));
        assert!(record.dns_ms.is_some());
        assert!(record.connection_ms.is_some());
        assert_eq!(session.state(), RunState::Completed);
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_ping_only_plan_leaves_throughput_unmeasured() {
        let mut session =
            SpeedTestSession::new(test_registry(), healthy_prober(), fast_settings());

        let record = session
            .run(
                ServerChoice::Key("beta".to_string()),
                TestPlan::PingOnly,
                &NullObserver,
            )
            .await
            .unwrap();

        assert!(record.ping_ms.is_some());
        assert_eq!(record.download_mbps, None);
        assert_eq!(record.upload_mbps, None);
        // Diagnostics still run for partial plans
        assert!(record.packet_loss_pct.is_some());
    }

    #[tokio::test]
    async fn test_auto_selection_picks_faster_endpoint() {
        let prober: Arc<dyn ProbeClient> = Arc::new(FnProber::new(|req: &ProbeRequest| {
            let host = req.url.host_str().unwrap_or_default().to_string();
            match req.method {
                Method::GET => ok_transfer(2, 4096),
                Method::POST => ok_transfer(2, 4096),
                _ if host == "beta.example.com" => ok_outcome(5),
                _ => ok_outcome(50),
            }
        }));

        let mut session = SpeedTestSession::new(test_registry(), prober, fast_settings());
        let record = session
            .run(ServerChoice::Auto, TestPlan::PingOnly, &NullObserver)
            .await
            .unwrap();

        assert_eq!(record.server_key, "beta");
    }

    #[tokio::test]
    async fn test_unknown_key_is_rejected() {
        let mut session =
            SpeedTestSession::new(test_registry(), healthy_prober(), fast_settings());

        let result = session
            .run(
                ServerChoice::Key("nowhere".to_string()),
                TestPlan::Full,
                &NullObserver,
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(session.state(), RunState::Failed);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_all_probes_failing_yields_unmeasured_record() {
        let prober: Arc<dyn ProbeClient> =
            Arc::new(FnProber::new(|_req: &ProbeRequest| failed_outcome(1)));
        let mut session = SpeedTestSession::new(test_registry(), prober, fast_settings());

        let record = session
            .run(
                ServerChoice::Key("alpha".to_string()),
                TestPlan::Full,
                &NullObserver,
            )
            .await
            .unwrap();

        // Nothing measured, but the run itself completes; unmeasured is a
        // valid state, not an error
        assert_eq!(record.ping_ms, None);
        assert_eq!(record.jitter_ms, None);
        assert_eq!(record.download_mbps, None);
        assert_eq!(record.upload_mbps, None);
        assert_eq!(record.packet_loss_pct, Some(100.0));
        assert_eq!(session.state(), RunState::Completed);
    }

    #[tokio::test]
    async fn test_two_runs_append_two_records_in_order() {
        let mut session =
            SpeedTestSession::new(test_registry(), healthy_prober(), fast_settings());

        let first = session
            .run(
                ServerChoice::Key("alpha".to_string()),
                TestPlan::PingOnly,
                &NullObserver,
            )
            .await
            .unwrap();

        let snapshot = session.history().records()[0].clone();

        session
            .run(
                ServerChoice::Key("beta".to_string()),
                TestPlan::PingOnly,
                &NullObserver,
            )
            .await
            .unwrap();

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().records()[0], snapshot);
        assert_eq!(session.history().records()[0], first);
        assert_eq!(session.history().records()[1].server_key, "beta");
    }

    #[tokio::test]
    async fn test_empty_registry_auto_selection_fails_run() {
        let mut session = SpeedTestSession::new(
            EndpointRegistry::new(vec![]),
            healthy_prober(),
            fast_settings(),
        );

        let result = session
            .run(ServerChoice::Auto, TestPlan::Full, &NullObserver)
            .await;

        assert!(matches!(result, Err(AppError::TestExecution(_))));
        assert_eq!(session.state(), RunState::Failed);
    }

    #[tokio::test]
    async fn test_session_recovers_after_failed_run() {
        let mut session =
            SpeedTestSession::new(test_registry(), healthy_prober(), fast_settings());

        let _ = session
            .run(
                ServerChoice::Key("nowhere".to_string()),
                TestPlan::Full,
                &NullObserver,
            )
            .await;
        assert_eq!(session.state(), RunState::Failed);

        // Failed is not an active state; a new run is allowed
        let record = session
            .run(
                ServerChoice::Key("alpha".to_string()),
                TestPlan::PingOnly,
                &NullObserver,
            )
            .await
            .unwrap();
        assert_eq!(record.server_key, "alpha");
        assert_eq!(session.state(), RunState::Completed);
    }

    #[test]
    fn test_run_state_activity() {
        assert!(!RunState::Idle.is_active());
        assert!(RunState::SelectingServer.is_active());
        assert!(RunState::MeasuringDownload.is_active());
        assert!(!RunState::Completed.is_active());
        assert!(!RunState::Failed.is_active());
    }

    #[test]
    fn test_plan_stage_membership() {
        assert!(TestPlan::Full.includes_latency());
        assert!(TestPlan::Full.includes_download());
        assert!(TestPlan::Full.includes_upload());
        assert!(TestPlan::PingOnly.includes_latency());
        assert!(!TestPlan::PingOnly.includes_download());
        assert!(!TestPlan::DownloadOnly.includes_upload());
        assert!(TestPlan::UploadOnly.includes_upload());
        assert!(!TestPlan::UploadOnly.includes_latency());
    }
}
