//! Engagement analytics service: regions of interest and heatmap clustering.

use crate::client::{ClientError, ResourceClient};
use crate::endpoint::ServiceEndpoint;
use sensor_interchange::schema::{validate_each, Schema, ValidationError};
use sensor_interchange::Point3D;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5053;

const CONFIGURATION: &str = "configuration";

/// Fewest points that enclose an area
pub const MIN_ROI_POINTS: usize = 3;

/// Region of interest on one camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// Camera containing the region
    pub id: String,
    /// Polygon vertices
    pub roi: Vec<Point3D>,
}

impl Engagement {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::new("id", "must not be empty"));
        }
        if self.roi.len() < MIN_ROI_POINTS {
            return Err(ValidationError::new(
                "roi",
                format!("needs at least {} points, got {}", MIN_ROI_POINTS, self.roi.len()),
            ));
        }
        Ok(())
    }
}

/// Detection clustering used to build heatmaps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapClustering {
    /// Seconds of detections clustered together
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Neighborhood distance
    #[serde(default = "default_eps")]
    pub eps: u64,
    /// Neighbors needed for a core point
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,
    /// Seconds between heatmap refreshes
    #[serde(default = "default_update_period")]
    pub update_period: u64,
}

fn default_window_seconds() -> u64 {
    5
}

fn default_eps() -> u64 {
    50
}

fn default_min_samples() -> u64 {
    3
}

fn default_update_period() -> u64 {
    30
}

fn default_period() -> u64 {
    5
}

impl Default for HeatmapClustering {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            eps: default_eps(),
            min_samples: default_min_samples(),
            update_period: default_update_period(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementConfiguration {
    pub heatmap: HeatmapClustering,
    pub engagement: Vec<Engagement>,
    /// Seconds between database updates
    #[serde(default = "default_period")]
    pub db_update_period: u64,
    /// Seconds before an engagement message expires from the store
    #[serde(default = "default_period")]
    pub message_expiration: u64,
}

impl Schema for EngagementConfiguration {
    const NAME: &'static str = "EngagementConfiguration";

    fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("heatmap.window_seconds", self.heatmap.window_seconds),
            ("heatmap.update_period", self.heatmap.update_period),
            ("db_update_period", self.db_update_period),
            ("message_expiration", self.message_expiration),
        ] {
            if value == 0 {
                return Err(ValidationError::new(field, "must be at least 1 second"));
            }
        }

        validate_each("engagement", &self.engagement, Engagement::validate)
    }
}

/// Client for the engagement analytics service
#[derive(Debug, Clone)]
pub struct EngagementClient {
    client: ResourceClient,
}

impl EngagementClient {
    pub fn new(endpoint: ServiceEndpoint) -> Result<Self, ClientError> {
        Ok(Self {
            client: ResourceClient::new(endpoint)?,
        })
    }

    /// Client for a service on the local host and [`DEFAULT_PORT`]
    pub fn local() -> Result<Self, ClientError> {
        Self::new(ServiceEndpoint::local(DEFAULT_PORT))
    }

    pub fn get_configuration(&self) -> Option<EngagementConfiguration> {
        self.client.get(CONFIGURATION)
    }

    pub fn set_configuration(&self, configuration: &EngagementConfiguration) -> bool {
        self.client.put(CONFIGURATION, configuration)
    }
}
