//! Server selection: rank registry endpoints by one-shot reachability probes

use crate::client::{ProbeClient, ProbeRequest};
use crate::engine::progress::{ProgressEvent, ProgressObserver};
use crate::registry::{Endpoint, EndpointRegistry};
use crate::stats::round_ms;
use std::time::Duration;

/// Observed rank of one endpoint
///
/// `Unreachable` is an explicit sentinel rather than a large synthetic
/// latency, so a genuinely slow server can never collide with a failed one.
/// The derived ordering places every `Reachable` value before `Unreachable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerRank {
    Reachable(Duration),
    Unreachable,
}

impl ServerRank {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ServerRank::Reachable(_))
    }

    /// Observed latency in whole milliseconds, if reachable
    pub fn latency_ms(&self) -> Option<u32> {
        match self {
            ServerRank::Reachable(elapsed) => Some(round_ms(elapsed.as_secs_f64() * 1000.0)),
            ServerRank::Unreachable => None,
        }
    }
}

impl std::fmt::Display for ServerRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerRank::Reachable(elapsed) => {
                write!(f, "{} ms", round_ms(elapsed.as_secs_f64() * 1000.0))
            }
            ServerRank::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Probes every registry entry once and picks the fastest
pub struct ServerSelector;

impl ServerSelector {
    /// Probe each endpoint serially, in registration order
    ///
    /// This is a ranking pass, not a throughput measurement, so probes are
    /// deliberately not parallelized: concurrent probes would contend for the
    /// link and skew each other's timings.
    pub async fn rank_all(
        prober: &dyn ProbeClient,
        registry: &EndpointRegistry,
        progress: &dyn ProgressObserver,
    ) -> Vec<(Endpoint, ServerRank)> {
        let mut ranking = Vec::with_capacity(registry.len());

        for endpoint in registry.iter() {
            let rank = match endpoint.target() {
                Ok(target) => {
                    let outcome = prober.probe(ProbeRequest::head(target.echo_url())).await;
                    if outcome.success {
                        ServerRank::Reachable(outcome.elapsed)
                    } else {
                        ServerRank::Unreachable
                    }
                }
                Err(_) => ServerRank::Unreachable,
            };

            progress.on_event(ProgressEvent::ServerProbed {
                key: endpoint.key.clone(),
                display_name: endpoint.display_name.clone(),
                rank,
            });

            ranking.push((endpoint.clone(), rank));
        }

        ranking
    }

    /// Select the endpoint with the minimum rank; ties go to the earliest
    /// registered endpoint. Returns `None` only for an empty registry.
    pub async fn select_best(
        prober: &dyn ProbeClient,
        registry: &EndpointRegistry,
        progress: &dyn ProgressObserver,
    ) -> Option<(Endpoint, ServerRank)> {
        let ranking = Self::rank_all(prober, registry, progress).await;
        // min_by keeps the first of equal elements, preserving registration order
        ranking.into_iter().min_by(|(_, a), (_, b)| a.cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NullObserver;
    use crate::engine::testing::FnProber;
    use crate::registry::Endpoint;

    fn endpoint(key: &str, host: &str) -> Endpoint {
        Endpoint {
            key: key.to_string(),
            display_name: key.to_uppercase(),
            primary_host: host.to_string(),
            backup_host: host.to_string(),
            location: "Test".to_string(),
        }
    }

    fn registry_abc() -> EndpointRegistry {
        EndpointRegistry::new(vec![
            endpoint("a", "a.example.com"),
            endpoint("b", "b.example.com"),
            endpoint("c", "c.example.com"),
        ])
    }

    #[test]
    fn test_rank_ordering() {
        let fast = ServerRank::Reachable(Duration::from_millis(20));
        let slow = ServerRank::Reachable(Duration::from_millis(5000));
        assert!(fast < slow);
        assert!(slow < ServerRank::Unreachable);
        assert!(fast < ServerRank::Unreachable);
    }

    #[test]
    fn test_rank_display() {
        assert_eq!(ServerRank::Reachable(Duration::from_millis(28)).to_string(), "28 ms");
        assert_eq!(ServerRank::Unreachable.to_string(), "unreachable");
        assert_eq!(ServerRank::Unreachable.latency_ms(), None);
    }

    #[tokio::test]
    async fn test_select_best_prefers_lowest_latency() {
        // A: 50ms, B: 20ms, C: unreachable -> B wins
        let prober = FnProber::new(|req: &ProbeRequest| {
            let host = req.url.host_str().unwrap_or_default().to_string();
            match host.as_str() {
                "a.example.com" => crate::engine::testing::ok_outcome(50),
                "b.example.com" => crate::engine::testing::ok_outcome(20),
                _ => crate::engine::testing::failed_outcome(10),
            }
        });

        let best = ServerSelector::select_best(&prober, &registry_abc(), &NullObserver)
            .await
            .unwrap();
        assert_eq!(best.0.key, "b");
        assert_eq!(best.1, ServerRank::Reachable(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_ties_break_by_registration_order() {
        let prober = FnProber::new(|_req: &ProbeRequest| crate::engine::testing::ok_outcome(30));
        let best = ServerSelector::select_best(&prober, &registry_abc(), &NullObserver)
            .await
            .unwrap();
        assert_eq!(best.0.key, "a");
    }

    #[tokio::test]
    async fn test_all_unreachable_still_selects_first() {
        let prober = FnProber::new(|_req: &ProbeRequest| crate::engine::testing::failed_outcome(5));
        let best = ServerSelector::select_best(&prober, &registry_abc(), &NullObserver)
            .await
            .unwrap();
        assert_eq!(best.0.key, "a");
        assert_eq!(best.1, ServerRank::Unreachable);
    }

    #[tokio::test]
    async fn test_empty_registry_selects_nothing() {
        let prober = FnProber::new(|_req: &ProbeRequest| crate::engine::testing::ok_outcome(10));
        let registry = EndpointRegistry::new(vec![]);
        let best = ServerSelector::select_best(&prober, &registry, &NullObserver).await;
        assert!(best.is_none());
    }

    #[tokio::test]
    async fn test_rank_all_preserves_registration_order() {
        let prober = FnProber::new(|_req: &ProbeRequest| crate::engine::testing::ok_outcome(10));
        let ranking = ServerSelector::rank_all(&prober, &registry_abc(), &NullObserver).await;
        let keys: Vec<_> = ranking.iter().map(|(e, _)| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
