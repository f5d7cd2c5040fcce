//! Service endpoint configuration.

use serde::{Deserialize, Serialize};

/// Host used when a client is built with defaults
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Where a configuration service listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Service host name or address
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Path prefix when the service sits behind a proxy, e.g. `analytics`
    #[serde(default)]
    pub base_path: Option<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            base_path: None,
        }
    }

    /// Endpoint on [`DEFAULT_HOST`]
    pub fn local(port: u16) -> Self {
        Self::new(DEFAULT_HOST, port)
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// `http://host:port` plus the base path, normalized to one leading slash
    /// and no trailing slash
    pub fn base_url(&self) -> String {
        let prefix = self
            .base_path
            .as_deref()
            .map(|path| path.trim_matches('/'))
            .filter(|path| !path.is_empty())
            .map(|path| format!("/{}", path))
            .unwrap_or_default();

        format!("http://{}:{}{}", self.host, self.port, prefix)
    }

    /// URL of a resource below the base URL
    pub fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url(), resource.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let endpoint = ServiceEndpoint::local(5050);
        assert_eq!(endpoint.base_url(), "http://127.0.0.1:5050");
        assert_eq!(endpoint.url("/configuration"), "http://127.0.0.1:5050/configuration");
    }

    #[test]
    fn test_base_path_is_normalized() {
        for raw in ["analytics", "/analytics", "/analytics/", "analytics/"] {
            let endpoint = ServiceEndpoint::new("10.0.0.2", 30080).with_base_path(raw);
            assert_eq!(endpoint.base_url(), "http://10.0.0.2:30080/analytics");
        }

        let endpoint = ServiceEndpoint::local(5020).with_base_path("/");
        assert_eq!(endpoint.base_url(), "http://127.0.0.1:5020");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let endpoint: ServiceEndpoint = serde_json::from_str(r#"{"port": 5053}"#).unwrap();
        assert_eq!(endpoint, ServiceEndpoint::local(5053));
    }
}
