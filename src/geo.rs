//! Best-effort client identity and location detection
//!
//! Resolves the public IP, ISP and coarse geolocation before a run so exports
//! can attribute results. Detection is independent of the test engine: any
//! failure is reported as a warning and never blocks testing.

use crate::error::{AppError, Result};
use crate::models::ClientInfo;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Timeout for the detection requests; detection must never stall a run
const DETECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Public IP echo service
const IP_DETECTION_URL: &str = "https://httpbin.org/ip";

/// Geolocation lookup base; the detected IP is appended
const GEO_LOOKUP_BASE: &str = "https://ipapi.co";

#[derive(Debug, Deserialize)]
struct IpEnvelope {
    origin: String,
}

#[derive(Debug, Deserialize)]
struct GeoLookup {
    country_name: Option<String>,
    city: Option<String>,
    region: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    org: Option<String>,
}

/// Detects the client's IP, ISP and location
pub struct LocationDetector {
    client: Client,
}

impl LocationDetector {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(DETECTION_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Detect client info, falling back to whatever was resolved before the
    /// first failure. A total failure yields default (empty) info plus a
    /// warning on stderr; the caller proceeds regardless.
    pub async fn detect(&self) -> ClientInfo {
        match self.perform_detection().await {
            Ok(info) => info,
            Err(e) => {
                eprintln!("Warning: location detection failed: {}. Test will continue.", e);
                ClientInfo::default()
            }
        }
    }

    async fn perform_detection(&self) -> Result<ClientInfo> {
        let ip = self.detect_ip().await?;

        let mut info = ClientInfo {
            ip: Some(ip.clone()),
            ..ClientInfo::default()
        };

        // Geo lookup failing still leaves a usable IP-only result
        match self.lookup_geo(&ip).await {
            Ok(geo) => {
                info.isp = geo.org;
                info.city = geo.city;
                info.region = geo.region;
                info.country = geo.country_name;
                info.latitude = geo.latitude;
                info.longitude = geo.longitude;
            }
            Err(e) => {
                eprintln!("Warning: geolocation lookup failed: {}", e);
            }
        }

        Ok(info)
    }

    async fn detect_ip(&self) -> Result<String> {
        let response = self
            .client
            .get(IP_DETECTION_URL)
            .send()
            .await
            .map_err(|e| AppError::network(format!("IP detection request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::network(format!(
                "IP detection service returned error: {}",
                response.status()
            )));
        }

        let envelope: IpEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::parse(format!("Failed to parse IP detection response: {}", e)))?;

        Ok(envelope.origin)
    }

    async fn lookup_geo(&self, ip: &str) -> Result<GeoLookup> {
        let url = format!("{}/{}/json/", GEO_LOOKUP_BASE, ip);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::network(format!("Geolocation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::network(format!(
                "Geolocation service returned error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::parse(format!("Failed to parse geolocation response: {}", e)))
    }
}
