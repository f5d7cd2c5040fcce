use serde::{Deserialize, Serialize};

/// Schema version stamped on every metropolis record
pub const METROPOLIS_VERSION: &str = "4.0";

/// `(x1, y1, x2, y2)`: top-left and bottom-right corners
pub type BoundingBox = (i64, i64, i64, i64);

/// Frame metadata in the metropolis minimal schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetropolisRecord {
    pub version: String,
    pub id: u64,
    /// ISO-8601 UTC with a trailing `Z`
    pub timestamp: String,
    #[serde(rename = "sensorId")]
    pub sensor_id: i64,
    /// One `x1|y1|x2|y2|label` string per object
    pub objects: Vec<String>,
    pub width: i64,
    pub height: i64,
}

impl MetropolisRecord {
    /// Encode one labelled box as `x1|y1|x2|y2|label`
    pub fn object(label: &str, bbox: BoundingBox) -> String {
        let (x1, y1, x2, y2) = bbox;
        format!("{}|{}|{}|{}|{}", x1, y1, x2, y2, label)
    }
}
