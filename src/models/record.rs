//! Measurement record: the complete result of one test run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Best-effort client identity and location, detected before a run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub isp: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ClientInfo {
    /// "City, Country" label for exports; `None` when neither is known
    pub fn location_label(&self) -> Option<String> {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(city), None) => Some(city.clone()),
            (None, Some(country)) => Some(country.clone()),
            (None, None) => None,
        }
    }
}

/// The complete result of one test run, possibly partially populated
///
/// Every metric field is optional: a partial run (e.g. ping-only) is a valid
/// record with only a subset of fields measured. `None` means "unmeasured",
/// never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Display name of the endpoint used
    pub server: String,
    /// Registry key of the endpoint used
    pub server_key: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub ping_ms: Option<u32>,
    pub jitter_ms: Option<u32>,
    pub packet_loss_pct: Option<f64>,
    pub dns_ms: Option<u32>,
    pub connection_ms: Option<u32>,
    /// Client identity/location at test time, if detection succeeded
    #[serde(default)]
    pub client: ClientInfo,
}

impl MeasurementRecord {
    /// Create a record for a run against the given endpoint, with every
    /// metric unmeasured
    pub fn new(server_key: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            server_key: server_key.into(),
            started_at: Utc::now(),
            download_mbps: None,
            upload_mbps: None,
            ping_ms: None,
            jitter_ms: None,
            packet_loss_pct: None,
            dns_ms: None,
            connection_ms: None,
            client: ClientInfo::default(),
        }
    }

    /// Whether any metric was measured at all
    pub fn has_measurements(&self) -> bool {
        self.download_mbps.is_some()
            || self.upload_mbps.is_some()
            || self.ping_ms.is_some()
            || self.jitter_ms.is_some()
            || self.packet_loss_pct.is_some()
            || self.dns_ms.is_some()
            || self.connection_ms.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unmeasured() {
        let record = MeasurementRecord::new("us-east", "US East (Virginia)");
        assert!(!record.has_measurements());
        assert_eq!(record.ping_ms, None);
        assert_eq!(record.download_mbps, None);
        assert_eq!(record.server_key, "us-east");
    }

    #[test]
    fn test_partial_record_is_valid() {
        let mut record = MeasurementRecord::new("eu-west", "Europe West (London)");
        record.ping_ms = Some(42);
        record.jitter_ms = Some(3);
        assert!(record.has_measurements());
        assert_eq!(record.download_mbps, None);
    }

    #[test]
    fn test_json_round_trip() {
        let mut record = MeasurementRecord::new("us-west", "US West (California)");
        record.download_mbps = Some(94.37);
        record.upload_mbps = Some(21.5);
        record.ping_ms = Some(28);
        record.jitter_ms = Some(4);
        record.packet_loss_pct = Some(10.0);
        record.dns_ms = Some(15);
        record.connection_ms = Some(55);
        record.client.ip = Some("203.0.113.7".to_string());
        record.client.isp = Some("Example Networks".to_string());
        record.client.city = Some("Lisbon".to_string());
        record.client.country = Some("Portugal".to_string());

        let json = serde_json::to_string(&record).unwrap();
        let parsed: MeasurementRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, parsed);
    }

    #[test]
    fn test_unmeasured_fields_round_trip_as_none() {
        let record = MeasurementRecord::new("canada", "Canada (Toronto)");
        let json = serde_json::to_string(&record).unwrap();
        let parsed: MeasurementRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.ping_ms, None);
        assert_eq!(parsed.packet_loss_pct, None);
        assert_eq!(record, parsed);
    }

    #[test]
    fn test_location_label() {
        let mut info = ClientInfo::default();
        assert_eq!(info.location_label(), None);

        info.country = Some("Japan".to_string());
        assert_eq!(info.location_label(), Some("Japan".to_string()));

        info.city = Some("Tokyo".to_string());
        assert_eq!(info.location_label(), Some("Tokyo, Japan".to_string()));
    }
}
