//! Camera service: capture, undistortion and streaming settings per camera.

use crate::client::{ClientError, ResourceClient};
use crate::endpoint::ServiceEndpoint;
use sensor_interchange::schema::{Schema, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

pub const DEFAULT_PORT: u16 = 5050;

const CONFIGURATION: &str = "configuration";

/// Lens correction parameters, passed through to the pipeline as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Undistort {
    pub camera_matrix: String,
    pub distortion_parameters: String,
    pub distortion_model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// RTSP output of one camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    pub port: u16,
    pub mapping: String,
    pub bitrate: u32,
    #[serde(default)]
    pub uri: Option<String>,
}

impl StreamSettings {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::new("port", "must not be 0"));
        }
        if self.mapping.is_empty() {
            return Err(ValidationError::new("mapping", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Capture device index
    pub index: u32,
    pub undistort: Undistort,
    pub resolution: Resolution,
    pub streaming: StreamSettings,
}

/// Configuration of every camera, keyed by camera id
///
/// Iteration yields `(id, config)` pairs ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CamerasConfiguration(BTreeMap<String, CameraConfig>);

impl CamerasConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, config: CameraConfig) -> Option<CameraConfig> {
        self.0.insert(id.into(), config)
    }

    pub fn get(&self, id: &str) -> Option<&CameraConfig> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, CameraConfig> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a CamerasConfiguration {
    type Item = (&'a String, &'a CameraConfig);
    type IntoIter = btree_map::Iter<'a, String, CameraConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for CamerasConfiguration {
    type Item = (String, CameraConfig);
    type IntoIter = btree_map::IntoIter<String, CameraConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, CameraConfig)> for CamerasConfiguration {
    fn from_iter<I: IntoIterator<Item = (K, CameraConfig)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, config)| (id.into(), config)).collect())
    }
}

impl Schema for CamerasConfiguration {
    const NAME: &'static str = "CamerasConfiguration";

    fn validate(&self) -> Result<(), ValidationError> {
        for (id, camera) in self {
            if id.is_empty() {
                return Err(ValidationError::new("<id>", "camera id must not be empty"));
            }
            camera
                .streaming
                .validate()
                .map_err(|e| e.within(format!("{}.streaming", id)))?;
        }
        Ok(())
    }
}

/// Client for the camera service
#[derive(Debug, Clone)]
pub struct CameraClient {
    client: ResourceClient,
}

impl CameraClient {
    pub fn new(endpoint: ServiceEndpoint) -> Result<Self, ClientError> {
        Ok(Self {
            client: ResourceClient::new(endpoint)?,
        })
    }

    /// Client for a service on the local host and [`DEFAULT_PORT`]
    pub fn local() -> Result<Self, ClientError> {
        Self::new(ServiceEndpoint::local(DEFAULT_PORT))
    }

    /// Current configuration, or `None` on any error
    pub fn get_configuration(&self) -> Option<CamerasConfiguration> {
        self.client.get(CONFIGURATION)
    }

    /// Replace the configuration; `true` only if the service accepted it
    pub fn set_configuration(&self, configuration: &CamerasConfiguration) -> bool {
        self.client.put(CONFIGURATION, configuration)
    }
}
