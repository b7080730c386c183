//! HTTP prober: single timed requests used as measurement samples

use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

/// Outcome of one timed network attempt
///
/// Produced per probe and consumed immediately by a sampler. `elapsed` is
/// always populated, including on failure, so callers can decide whether a
/// failed attempt still carries timing information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    /// Wall-clock time from request start to response completion
    pub elapsed: Duration,
    /// Bytes transferred (response body for downloads, request body for uploads)
    pub bytes: u64,
    /// Whether the request completed with a success status
    pub success: bool,
}

impl ProbeOutcome {
    /// Elapsed time in fractional milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    fn failure(elapsed: Duration) -> Self {
        Self {
            elapsed,
            bytes: 0,
            success: false,
        }
    }
}

/// One probe request as issued by a sampler
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub url: Url,
    pub method: Method,
    /// Payload for upload probes; its length is counted as transferred bytes
    pub body: Option<Vec<u8>>,
    /// Read the response body to completion and count its bytes
    pub read_body: bool,
    /// Per-request timeout; `None` means no timeout beyond the transport's own
    pub timeout: Option<Duration>,
}

impl ProbeRequest {
    /// Lightweight HEAD probe (latency, selection, reachability)
    pub fn head(url: Url) -> Self {
        Self {
            url,
            method: Method::HEAD,
            body: None,
            read_body: false,
            timeout: None,
        }
    }

    /// GET probe that reads the full response body (downloads, connection timing)
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            body: None,
            read_body: true,
            timeout: None,
        }
    }

    /// POST probe carrying an upload payload; timed to acknowledgment
    pub fn post(url: Url, body: Vec<u8>) -> Self {
        Self {
            url,
            method: Method::POST,
            body: Some(body),
            read_body: false,
            timeout: None,
        }
    }

    /// Apply a per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Abstraction over the transport issuing probes
///
/// Samplers depend on this trait rather than on reqwest directly so tests can
/// script probe outcomes without a network.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// Issue one request and measure it. Network errors and non-success
    /// statuses become `success=false` outcomes; retry policy belongs to
    /// callers, never to the prober.
    async fn probe(&self, request: ProbeRequest) -> ProbeOutcome;
}

/// reqwest-backed prober
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Create a prober. No client-level timeout is applied; the only request
    /// timeouts are the ones samplers attach per probe.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn execute(&self, request: &ProbeRequest) -> std::result::Result<(u16, u64), reqwest::Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .header("Cache-Control", "no-cache");

        if let Some(ref body) = request.body {
            builder = builder
                .header("Content-Type", "application/octet-stream")
                .body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let bytes = if request.read_body {
            response.bytes().await?.len() as u64
        } else if let Some(ref body) = request.body {
            // Upload size counts once the request is acknowledged
            body.len() as u64
        } else {
            0
        };

        Ok((status, bytes))
    }
}

#[async_trait]
impl ProbeClient for HttpProber {
    async fn probe(&self, request: ProbeRequest) -> ProbeOutcome {
        let start = Instant::now();

        let result = match request.timeout {
            Some(limit) => match timeout(limit, self.execute(&request)).await {
                Ok(inner) => inner.map(Some),
                Err(_) => Ok(None), // timed out
            },
            None => self.execute(&request).await.map(Some),
        };

        let elapsed = start.elapsed();

        match result {
            Ok(Some((status, bytes))) if (200..300).contains(&status) => ProbeOutcome {
                elapsed,
                bytes,
                success: true,
            },
            _ => ProbeOutcome::failure(elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_request_constructors() {
        let url = Url::parse("https://example.com/get").unwrap();

        let head = ProbeRequest::head(url.clone());
        assert_eq!(head.method, Method::HEAD);
        assert!(!head.read_body);
        assert!(head.body.is_none());

        let get = ProbeRequest::get(url.clone());
        assert_eq!(get.method, Method::GET);
        assert!(get.read_body);

        let post = ProbeRequest::post(url, vec![0u8; 16]);
        assert_eq!(post.method, Method::POST);
        assert_eq!(post.body.as_ref().unwrap().len(), 16);
        assert!(!post.read_body);
    }

    #[test]
    fn test_probe_request_timeout() {
        let url = Url::parse("https://example.com/get").unwrap();
        let req = ProbeRequest::head(url).with_timeout(Duration::from_secs(5));
        assert_eq!(req.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_outcome_elapsed_ms() {
        let outcome = ProbeOutcome {
            elapsed: Duration::from_millis(250),
            bytes: 0,
            success: true,
        };
        assert_eq!(outcome.elapsed_ms(), 250.0);
    }

    #[test]
    fn test_failure_outcome_keeps_elapsed() {
        let outcome = ProbeOutcome::failure(Duration::from_millis(42));
        assert!(!outcome.success);
        assert_eq!(outcome.bytes, 0);
        assert_eq!(outcome.elapsed, Duration::from_millis(42));
    }

    #[tokio::test]
    async fn test_prober_reports_failure_for_unreachable_host() {
        let prober = HttpProber::new().unwrap();
        // Reserved TLD, guaranteed not to resolve
        let url = Url::parse("http://unreachable.invalid/get").unwrap();
        let outcome = prober
            .probe(ProbeRequest::head(url).with_timeout(Duration::from_secs(2)))
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.bytes, 0);
    }
}
