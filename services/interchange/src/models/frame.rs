//! Direction frames: per-frame object positions and movement directions.
//!
//! ```json
//! {
//!     "id": 1,
//!     "cameraid": "camera1",
//!     "timestamp": "2025-01-01 00:00:00.000000",
//!     "width": 1920,
//!     "height": 1080,
//!     "detections": [
//!         {
//!             "objectid": "object1",
//!             "position": {"x": 10, "y": 20, "z": 0},
//!             "direction": {"x": 1, "y": 0, "z": -1}
//!         }
//!     ]
//! }
//! ```

use super::Point3D;
use crate::schema::{validate_each, Schema, ValidationError};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Lexical format of frame timestamps stamped by the publisher
pub const FRAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One tracked object in a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Tracker-assigned object id
    pub objectid: String,
    pub position: Point3D,
    /// Movement direction of the object
    pub direction: Point3D,
}

impl Detection {
    pub fn new(objectid: impl Into<String>, position: Point3D, direction: Point3D) -> Self {
        Self {
            objectid: objectid.into(),
            position,
            direction,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.objectid.is_empty() {
            return Err(ValidationError::new("objectid", "must not be empty"));
        }
        Ok(())
    }
}

/// A single camera frame with its detections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub id: u64,
    pub cameraid: String,
    pub timestamp: String,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
}

/// Accepts the publisher's own format and ISO 8601 with or without a zone
fn is_frame_timestamp(text: &str) -> bool {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(text, format).is_ok())
        || DateTime::parse_from_rfc3339(text).is_ok()
}

impl Schema for Frame {
    const NAME: &'static str = "Frame";

    fn validate(&self) -> Result<(), ValidationError> {
        if self.cameraid.is_empty() {
            return Err(ValidationError::new("cameraid", "must not be empty"));
        }

        if !is_frame_timestamp(&self.timestamp) {
            return Err(ValidationError::new(
                "timestamp",
                format!("'{}' is not a frame timestamp", self.timestamp),
            ));
        }

        validate_each("detections", &self.detections, Detection::validate)
    }
}
