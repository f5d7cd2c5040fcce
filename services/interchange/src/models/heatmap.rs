use super::Point2D;
use crate::schema::{validate_each, Schema, ValidationError};
use serde::{Deserialize, Serialize};

/// A heatmap spot with a position, intensity and radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub position: Point2D,
    pub intensity: f64,
    pub radius: f64,
}

impl Blob {
    pub fn new(position: Point2D, intensity: f64, radius: f64) -> Self {
        Self {
            position,
            intensity,
            radius,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        // JSON has no NaN or infinity; serde_json would write them as null
        if !self.intensity.is_finite() {
            return Err(ValidationError::new("intensity", "must be a finite number"));
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(ValidationError::new(
                "radius",
                "must be a finite, non-negative number",
            ));
        }
        Ok(())
    }
}

/// Heatmap published for one refresh period
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Heatmap {
    pub heatmap: Vec<Blob>,
}

impl Heatmap {
    pub fn new(blobs: Vec<Blob>) -> Self {
        Self { heatmap: blobs }
    }
}

impl Schema for Heatmap {
    const NAME: &'static str = "Heatmap";

    fn validate(&self) -> Result<(), ValidationError> {
        validate_each("heatmap", &self.heatmap, Blob::validate)
    }
}
