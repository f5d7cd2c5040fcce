//! Analytics service: which downstream actions fire on detections.

use crate::client::{ClientError, ResourceClient};
use crate::endpoint::ServiceEndpoint;
use sensor_interchange::schema::{Schema, ValidationError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5020;

const CONFIGURATION: &str = "configuration";

/// A downstream service the analytics service calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfiguration {
    pub enable: bool,
    pub port: u16,
    pub ip: String,
    /// Seconds between two triggers of the same action
    pub time_threshold: u64,
}

impl ServiceConfiguration {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.enable && self.ip.is_empty() {
            return Err(ValidationError::new("ip", "required when enabled"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsConfiguration {
    pub move_camera: ServiceConfiguration,
    pub record: ServiceConfiguration,
}

impl Schema for AnalyticsConfiguration {
    const NAME: &'static str = "AnalyticsConfiguration";

    fn validate(&self) -> Result<(), ValidationError> {
        self.move_camera
            .validate()
            .map_err(|e| e.within("move_camera"))?;
        self.record.validate().map_err(|e| e.within("record"))
    }
}

/// Client for the analytics service
///
/// The service is often reached through a reverse proxy; give the endpoint a
/// base path in that case.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    client: ResourceClient,
}

impl AnalyticsClient {
    pub fn new(endpoint: ServiceEndpoint) -> Result<Self, ClientError> {
        Ok(Self {
            client: ResourceClient::new(endpoint)?,
        })
    }

    /// Client for a service on the local host and [`DEFAULT_PORT`]
    pub fn local() -> Result<Self, ClientError> {
        Self::new(ServiceEndpoint::local(DEFAULT_PORT))
    }

    pub fn get_configuration(&self) -> Option<AnalyticsConfiguration> {
        self.client.get(CONFIGURATION)
    }

    pub fn set_configuration(&self, configuration: &AnalyticsConfiguration) -> bool {
        self.client.put(CONFIGURATION, configuration)
    }
}
