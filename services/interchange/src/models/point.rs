use serde::{Deserialize, Serialize};

/// A point in 3D space; `z` is 0 when omitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub z: i64,
}

impl Point3D {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// A point on the `z = 0` plane
    pub fn planar(x: i64, y: i64) -> Self {
        Self { x, y, z: 0 }
    }
}

/// A point in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: i64,
    pub y: i64,
}

impl Point2D {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}
