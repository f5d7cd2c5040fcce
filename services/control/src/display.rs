//! Display service: composited camera inputs and the heatmap overlay toggle.

use crate::client::{ClientError, ResourceClient};
use crate::endpoint::ServiceEndpoint;
use sensor_interchange::schema::{validate_each, Schema, ValidationError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5052;

const CONFIGURATION: &str = "configuration";
const HEATMAP: &str = "heatmap";

/// Stream URIs of the cameras shown on the display
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CameraInputs {
    pub cameras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayConfiguration {
    pub inputs: CameraInputs,
    pub heatmap: bool,
}

impl Schema for DisplayConfiguration {
    const NAME: &'static str = "DisplayConfiguration";

    fn validate(&self) -> Result<(), ValidationError> {
        validate_each("cameras", &self.inputs.cameras, |uri: &String| {
            if uri.is_empty() {
                return Err(ValidationError::new("uri", "must not be empty"));
            }
            Ok(())
        })
        .map_err(|e| e.within("inputs"))
    }
}

/// Body of the `/heatmap` resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapOverlay {
    pub heatmap: bool,
}

impl Schema for HeatmapOverlay {
    const NAME: &'static str = "HeatmapOverlay";

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Client for the display service
#[derive(Debug, Clone)]
pub struct DisplayClient {
    client: ResourceClient,
}

impl DisplayClient {
    pub fn new(endpoint: ServiceEndpoint) -> Result<Self, ClientError> {
        Ok(Self {
            client: ResourceClient::new(endpoint)?,
        })
    }

    /// Client for a service on the local host and [`DEFAULT_PORT`]
    pub fn local() -> Result<Self, ClientError> {
        Self::new(ServiceEndpoint::local(DEFAULT_PORT))
    }

    pub fn get_configuration(&self) -> Option<DisplayConfiguration> {
        self.client.get(CONFIGURATION)
    }

    pub fn set_configuration(&self, configuration: &DisplayConfiguration) -> bool {
        self.client.put(CONFIGURATION, configuration)
    }

    /// Whether the heatmap overlay is shown, or `None` on any error
    pub fn get_heatmap(&self) -> Option<bool> {
        self.client
            .get::<HeatmapOverlay>(HEATMAP)
            .map(|overlay| overlay.heatmap)
    }

    pub fn set_heatmap(&self, enabled: bool) -> bool {
        self.client.put(HEATMAP, &HeatmapOverlay { heatmap: enabled })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{closed_endpoint, idle_endpoint, serve_once};

    #[test]
    fn test_get_configuration() {
        let (endpoint, server) = serve_once(
            200,
            r#"{"inputs": {"cameras": ["rtsp://cam0/stream", "rtsp://cam1/stream"]}, "heatmap": true}"#,
        );
        let client = DisplayClient::new(endpoint).unwrap();

        let configuration = client.get_configuration().unwrap();
        assert_eq!(configuration.inputs.cameras.len(), 2);
        assert!(configuration.heatmap);
        assert_eq!(server.join().unwrap().path, "/configuration");
    }

    #[test]
    fn test_heatmap_toggle_wire_shape() {
        let (endpoint, server) = serve_once(200, "");
        let client = DisplayClient::new(endpoint).unwrap();
        assert!(client.set_heatmap(false));

        let request = server.join().unwrap();
        assert_eq!(request.path, "/heatmap");
        assert_eq!(request.body, r#"{"heatmap":false}"#);

        let (endpoint, server) = serve_once(200, r#"{"heatmap": true}"#);
        let client = DisplayClient::new(endpoint).unwrap();
        assert_eq!(client.get_heatmap(), Some(true));
        server.join().unwrap();
    }

    #[test]
    fn test_heatmap_wrong_type_is_none() {
        let (endpoint, server) = serve_once(200, r#"{"heatmap": "yes"}"#);
        let client = DisplayClient::new(endpoint).unwrap();
        assert_eq!(client.get_heatmap(), None);
        server.join().unwrap();

        let client = DisplayClient::new(closed_endpoint()).unwrap();
        assert_eq!(client.get_heatmap(), None);
    }

    #[test]
    fn test_empty_camera_uri_is_not_sent() {
        let (endpoint, listener) = idle_endpoint();
        let client = DisplayClient::new(endpoint).unwrap();

        let configuration = DisplayConfiguration {
            inputs: CameraInputs {
                cameras: vec!["rtsp://cam0/stream".to_string(), String::new()],
            },
            heatmap: false,
        };
        assert_eq!(
            configuration.validate().unwrap_err().field,
            "inputs.cameras[1].uri"
        );
        assert!(!client.set_configuration(&configuration));
        assert!(listener.accept().is_err());
    }
}
