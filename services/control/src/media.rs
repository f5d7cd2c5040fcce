//! Media service: input cameras, the composed output stream and its brightness.

use crate::camera::Resolution;
use crate::client::{ClientError, ResourceClient};
use crate::endpoint::ServiceEndpoint;
use sensor_interchange::schema::{validate_each, Schema, ValidationError};
use sensor_interchange::Point2D;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5051;

const CONFIGURATION: &str = "configuration";
const BRIGHTNESS: &str = "brightness";

/// Camera feeding the media pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCamera {
    pub id: String,
    pub index: u32,
}

/// RTSP output produced by the media service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputStream {
    /// 0x0 keeps the input resolution
    #[serde(default)]
    pub resolution: Resolution,
    pub brightness: f64,
    pub port: u16,
    pub mapping: String,
    pub bitrate: u32,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfiguration {
    pub inputs: Vec<InputCamera>,
    pub output: OutputStream,
    pub cam_position: Point2D,
    pub head_pose_confidence: f64,
}

fn check_brightness(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new("brightness", "must be a finite number"));
    }
    Ok(())
}

impl Schema for MediaConfiguration {
    const NAME: &'static str = "MediaConfiguration";

    fn validate(&self) -> Result<(), ValidationError> {
        validate_each("inputs", &self.inputs, |camera: &InputCamera| {
            if camera.id.is_empty() {
                return Err(ValidationError::new("id", "must not be empty"));
            }
            Ok(())
        })?;

        check_brightness(self.output.brightness).map_err(|e| e.within("output"))?;
        if self.output.port == 0 {
            return Err(ValidationError::new("output.port", "must not be 0"));
        }

        // JSON has no encoding for NaN or infinity
        if !self.head_pose_confidence.is_finite() {
            return Err(ValidationError::new("head_pose_confidence", "must be finite"));
        }
        Ok(())
    }
}

/// Body of the `/brightness` resource
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brightness {
    pub brightness: f64,
}

impl Schema for Brightness {
    const NAME: &'static str = "Brightness";

    fn validate(&self) -> Result<(), ValidationError> {
        check_brightness(self.brightness)
    }
}

/// Client for the media service
#[derive(Debug, Clone)]
pub struct MediaClient {
    client: ResourceClient,
}

impl MediaClient {
    pub fn new(endpoint: ServiceEndpoint) -> Result<Self, ClientError> {
        Ok(Self {
            client: ResourceClient::new(endpoint)?,
        })
    }

    /// Client for a service on the local host and [`DEFAULT_PORT`]
    pub fn local() -> Result<Self, ClientError> {
        Self::new(ServiceEndpoint::local(DEFAULT_PORT))
    }

    pub fn get_configuration(&self) -> Option<MediaConfiguration> {
        self.client.get(CONFIGURATION)
    }

    pub fn set_configuration(&self, configuration: &MediaConfiguration) -> bool {
        self.client.put(CONFIGURATION, configuration)
    }

    /// Output brightness, or `None` on any error
    pub fn get_brightness(&self) -> Option<f64> {
        self.client
            .get::<Brightness>(BRIGHTNESS)
            .map(|b| b.brightness)
    }

    pub fn set_brightness(&self, brightness: f64) -> bool {
        self.client.put(BRIGHTNESS, &Brightness { brightness })
    }
}
