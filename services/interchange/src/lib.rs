//! Sensor Interchange - stream-backed metadata exchange between sensor services
//!
//! This library moves per-frame sensor metadata between producers and
//! consumers over a shared append-only log (Redis Streams, or an in-process
//! store for tests and single-binary deployments). It handles:
//!
//! - Direction frames: tracked objects with position and heading
//! - Heatmaps: intensity blobs for one refresh period
//! - Metropolis minimal schema records for downstream analytics
//!
//! Every record is validated against its schema before it is written and
//! after it is read. Entries carry a single `data` field holding the JSON
//! document.
//!
//! # Example
//!
//! ```rust,no_run
//! use sensor_interchange::prelude::*;
//! use std::time::Duration;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = InterchangeConfig::from_env()?;
//!
//!     let mut publisher = DirectionPublisher::from_config(&config)?;
//!     let consumer = DirectionConsumer::direction_from_config(&config)?;
//!
//!     let cursor = consumer.latest_cursor();
//!     publisher.send(vec![Detection::new(
//!         "0",
//!         Point3D::planar(0, 1),
//!         Point3D::planar(0, 1),
//!     )]);
//!
//!     let (frame, _cursor) = consumer.get(Duration::from_secs(1), cursor);
//!     println!("{:?}", frame);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consumer;
pub mod metropolis;
pub mod models;
pub mod publisher;
pub mod schema;
pub mod store;

/// Name of the single field every published entry carries
pub const DATA_FIELD: &str = "data";

// Re-export main types
pub use config::{
    BackendKind, ConfigError, InterchangeConfig, PublishConfig, StoreConfig, StreamConfig,
};
pub use consumer::{
    ConsumerError, DirectionConsumer, FrameConsumer, HeatmapConsumer, DEFAULT_READ_TIMEOUT,
};
pub use metropolis::{EncodeError, MetropolisEncoder};
pub use models::{
    Blob, BoundingBox, Detection, Frame, Heatmap, MetropolisRecord, Point2D, Point3D,
};
pub use publisher::{
    DirectionPublisher, FrameOptions, HeatmapPublisher, DEFAULT_BOUND, DEFAULT_CAMERA_ID,
};
pub use schema::{CodecError, Schema, ValidationError};
pub use store::{
    EntryId, LogBackend, LogStore, MemoryBackend, ReadBatch, RedisBackend, StoreError,
    StreamCursor, StreamEntry,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::InterchangeConfig;
    pub use crate::consumer::{DirectionConsumer, FrameConsumer, HeatmapConsumer};
    pub use crate::metropolis::MetropolisEncoder;
    pub use crate::models::{Blob, Detection, Frame, Heatmap, Point2D, Point3D};
    pub use crate::publisher::{DirectionPublisher, FrameOptions, HeatmapPublisher};
    pub use crate::store::{LogStore, StreamCursor};
}
