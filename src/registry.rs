//! Fixed registry of remote test endpoints and probe target URL construction
//!
//! The registry is the static set of international endpoints the tester can
//! measure against. It is defined once at startup and never mutated; iteration
//! order is registration order, which the server selector relies on for stable
//! tie-breaking.

use crate::error::{AppError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

/// A named remote test endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Stable identifier (e.g. "us-east")
    pub key: String,
    /// Human-readable name shown in reports
    pub display_name: String,
    /// Primary host serving the echo/download/upload paths
    pub primary_host: String,
    /// Secondary host for the region, kept as registry data
    pub backup_host: String,
    /// Location label for display and exports
    pub location: String,
}

impl Endpoint {
    /// Build the probe target for this endpoint's primary host
    pub fn target(&self) -> Result<ProbeTarget> {
        ProbeTarget::from_host(&self.primary_host)
    }
}

/// Ordered, immutable set of candidate endpoints
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    /// Build a registry from an explicit endpoint list
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    /// The built-in set of international test endpoints
    pub fn builtin() -> Self {
        let entry = |key: &str, name: &str, host: &str, backup: &str, location: &str| Endpoint {
            key: key.to_string(),
            display_name: name.to_string(),
            primary_host: host.to_string(),
            backup_host: backup.to_string(),
            location: location.to_string(),
        };

        Self::new(vec![
            entry("us-east", "US East (Virginia)", "httpbin.org", "jsonplaceholder.typicode.com", "Virginia, USA"),
            entry("us-west", "US West (California)", "postman-echo.com", "httpbin.org", "California, USA"),
            entry("eu-west", "Europe West (London)", "httpbin.org", "reqres.in", "London, UK"),
            entry("eu-central", "Europe Central (Frankfurt)", "httpbin.org", "postman-echo.com", "Frankfurt, Germany"),
            entry("asia-east", "Asia East (Tokyo)", "httpbin.org", "jsonplaceholder.typicode.com", "Tokyo, Japan"),
            entry("asia-southeast", "Asia Southeast (Singapore)", "postman-echo.com", "httpbin.org", "Singapore"),
            entry("australia", "Australia (Sydney)", "httpbin.org", "reqres.in", "Sydney, Australia"),
            entry("canada", "Canada (Toronto)", "jsonplaceholder.typicode.com", "httpbin.org", "Toronto, Canada"),
            entry("brazil", "Brazil (São Paulo)", "httpbin.org", "postman-echo.com", "São Paulo, Brazil"),
        ])
    }

    /// Look up an endpoint by key
    pub fn get(&self, key: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.key == key)
    }

    /// Iterate endpoints in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    /// Number of registered endpoints
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// All registered keys, in registration order
    pub fn keys(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.key.as_str()).collect()
    }
}

/// URL builder for the standard probe paths of a test endpoint
///
/// Wraps a base URL and derives the echo (`/get`), download (`/bytes/{n}`)
/// and upload (`/post`) paths from it. Production targets are built from a
/// registry host over HTTPS; tests construct targets directly from a local
/// mock server's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTarget {
    base: Url,
}

impl ProbeTarget {
    /// Build a target from an endpoint host. Bare hostnames get HTTPS; a host
    /// carrying an explicit scheme is taken as-is, which lets a registry point
    /// at a local plain-HTTP test server.
    pub fn from_host(host: &str) -> Result<Self> {
        if host.is_empty() {
            return Err(AppError::validation("Endpoint host must not be empty"));
        }
        if host.contains("://") {
            return Self::from_base_url(host);
        }
        let base = Url::parse(&format!("https://{}/", host))?;
        Ok(Self { base })
    }

    /// Build a target from a full base URL (scheme included)
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;
        if base.host_str().is_none() {
            return Err(AppError::validation("Probe target URL must have a host"));
        }
        Ok(Self { base })
    }

    /// Host of this target, for display
    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or_default()
    }

    /// Small-payload echo URL with a cache-busting query parameter
    pub fn echo_url(&self) -> Url {
        let mut url = self.join("get");
        url.query_pairs_mut()
            .append_pair("_", &Self::cache_bust_token());
        url
    }

    /// Download URL serving `bytes` octets, with a cache-busting parameter
    pub fn download_url(&self, bytes: u64) -> Url {
        let mut url = self.join(&format!("bytes/{}", bytes));
        url.query_pairs_mut()
            .append_pair("_", &Self::cache_bust_token());
        url
    }

    /// Upload sink URL accepting posted payloads
    pub fn upload_url(&self) -> Url {
        self.join("post")
    }

    fn join(&self, path: &str) -> Url {
        // Joining a relative path onto a validated base cannot fail
        self.base
            .join(path)
            .unwrap_or_else(|_| self.base.clone())
    }

    fn cache_bust_token() -> String {
        Utc::now().timestamp_millis().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_shape() {
        let registry = EndpointRegistry::builtin();
        assert_eq!(registry.len(), 9);
        assert!(!registry.is_empty());
        assert_eq!(registry.keys()[0], "us-east");
        assert_eq!(registry.keys()[8], "brazil");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = EndpointRegistry::builtin();
        let endpoint = registry.get("asia-east").unwrap();
        assert_eq!(endpoint.display_name, "Asia East (Tokyo)");
        assert_eq!(endpoint.primary_host, "httpbin.org");
        assert!(registry.get("mars-north").is_none());
    }

    #[test]
    fn test_registration_order_is_stable() {
        let registry = EndpointRegistry::builtin();
        let keys: Vec<_> = registry.iter().map(|e| e.key.clone()).collect();
        assert_eq!(keys, registry.keys());
    }

    #[test]
    fn test_target_from_host() {
        let target = ProbeTarget::from_host("example.com").unwrap();
        assert_eq!(target.host(), "example.com");
        assert!(target.echo_url().as_str().starts_with("https://example.com/get?_="));
        assert!(target
            .download_url(1_048_576)
            .as_str()
            .starts_with("https://example.com/bytes/1048576?_="));
        assert_eq!(target.upload_url().as_str(), "https://example.com/post");
    }

    #[test]
    fn test_target_from_base_url() {
        let target = ProbeTarget::from_base_url("http://127.0.0.1:8080").unwrap();
        assert!(target.echo_url().as_str().starts_with("http://127.0.0.1:8080/get?_="));
    }

    #[test]
    fn test_target_rejects_empty_host() {
        assert!(ProbeTarget::from_host("").is_err());
    }

    #[test]
    fn test_cache_bust_tokens_differ_over_time() {
        let target = ProbeTarget::from_host("example.com").unwrap();
        let first = target.echo_url();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = target.echo_url();
        assert_ne!(first.query(), second.query());
    }

    #[test]
    fn test_endpoint_target() {
        let registry = EndpointRegistry::builtin();
        let endpoint = registry.get("canada").unwrap();
        let target = endpoint.target().unwrap();
        assert_eq!(target.host(), "jsonplaceholder.typicode.com");
    }
}
