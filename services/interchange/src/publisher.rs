//! Frame publishers.
//!
//! A publisher assembles a record from caller input plus its own defaults,
//! validates it, and appends `{"data": <json>}` to its stream. Publishing is
//! all-or-nothing: a record that fails validation is logged and never
//! written.

use crate::config::InterchangeConfig;
use crate::consumer::FrameConsumer;
use crate::models::{Detection, Frame, Heatmap, FRAME_TIMESTAMP_FORMAT};
use crate::schema::{self, Schema};
use crate::store::{Fields, LogStore, StoreError};
use crate::DATA_FIELD;
use chrono::Local;
use tracing::{debug, error, info, instrument};

/// Approximate number of entries a stream keeps unless told otherwise
pub const DEFAULT_BOUND: usize = 1000;

/// Camera id stamped on frames when none is configured
pub const DEFAULT_CAMERA_ID: &str = "camera";

/// Validate, serialize and append one record
fn publish<T: Schema>(store: &LogStore, stream: &str, record: &T, bound: usize) -> bool {
    let json = match schema::encode(record) {
        Ok(json) => json,
        Err(e) => {
            error!(stream, "Error validating data: {}", e);
            return false;
        }
    };

    debug!(stream, size = json.len(), "Publishing {}", T::NAME);
    let fields = Fields::from([(DATA_FIELD.to_string(), json)]);
    store.append(stream, &fields, bound)
}

/// Per-call overrides for [`DirectionPublisher::send_with`]
#[derive(Debug, Clone, Default)]
pub struct FrameOptions {
    /// Frame id; the publisher's counter is used when unset
    pub frame_id: Option<u64>,
    /// Frame timestamp; the local wall clock is used when unset
    pub timestamp: Option<String>,
    /// Approximate number of entries to retain; the publisher's bound when unset
    pub bound: Option<usize>,
}

impl FrameOptions {
    pub fn frame_id(mut self, id: u64) -> Self {
        self.frame_id = Some(id);
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn bound(mut self, bound: usize) -> Self {
        self.bound = Some(bound);
        self
    }
}

/// Publishes direction frames for one camera feed
///
/// The frame counter is advanced through `&mut self`, so an instance has a
/// single writer. Share the stream, not the publisher, between producers.
#[derive(Debug)]
pub struct DirectionPublisher {
    store: LogStore,
    stream: String,
    camera_id: Option<String>,
    resolution: (u32, u32),
    bound: usize,
    frame_counter: u64,
}

impl DirectionPublisher {
    /// Create a publisher writing to `stream`
    pub fn new(store: LogStore, stream: impl Into<String>) -> Self {
        Self {
            store,
            stream: stream.into(),
            camera_id: None,
            resolution: (0, 0),
            bound: DEFAULT_BOUND,
            frame_counter: 0,
        }
    }

    /// Connect to the configured store and direction stream
    pub fn from_config(config: &InterchangeConfig) -> Result<Self, StoreError> {
        let store = LogStore::connect(&config.store)?;
        let mut publisher = Self::new(store, &config.streams.direction)
            .with_resolution(config.publish.width, config.publish.height)
            .with_bound(config.publish.bound);
        publisher.camera_id = config.publish.camera_id.clone();

        info!(stream = %publisher.stream, "Direction publisher ready");
        Ok(publisher)
    }

    /// Set the camera id stamped on every frame; empty means the default
    pub fn with_camera_id(mut self, camera_id: impl Into<String>) -> Self {
        self.camera_id = Some(camera_id.into());
        self
    }

    /// Set the frame width and height stamped on every frame
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Set the number of entries kept when a send does not say otherwise
    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = bound;
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Publish detections with the default frame id, timestamp and bound
    pub fn send(&mut self, detections: Vec<Detection>) -> bool {
        self.send_with(detections, FrameOptions::default())
    }

    /// Publish detections, overriding the defaults given in `options`
    #[instrument(skip(self, detections, options), fields(stream = %self.stream, count = detections.len()))]
    pub fn send_with(&mut self, detections: Vec<Detection>, options: FrameOptions) -> bool {
        let bound = options.bound.unwrap_or(self.bound);
        let frame = self.assemble(detections, options);
        publish(&self.store, &self.stream, &frame, bound)
    }

    fn assemble(&mut self, detections: Vec<Detection>, options: FrameOptions) -> Frame {
        let id = options.frame_id.unwrap_or_else(|| {
            let id = self.frame_counter;
            self.frame_counter += 1;
            id
        });

        let timestamp = options
            .timestamp
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| Local::now().format(FRAME_TIMESTAMP_FORMAT).to_string());

        let cameraid = self
            .camera_id
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CAMERA_ID)
            .to_string();

        Frame {
            id,
            cameraid,
            timestamp,
            width: self.resolution.0,
            height: self.resolution.1,
            detections,
        }
    }

    /// A consumer of this publisher's stream on its own store connection
    pub fn subscriber(&self) -> Result<FrameConsumer<Frame>, StoreError> {
        Ok(FrameConsumer::new(self.store.reopen()?, self.stream.clone()))
    }
}

/// Publishes heatmaps
#[derive(Debug, Clone)]
pub struct HeatmapPublisher {
    store: LogStore,
    stream: String,
    bound: usize,
}

impl HeatmapPublisher {
    pub fn new(store: LogStore, stream: impl Into<String>) -> Self {
        Self {
            store,
            stream: stream.into(),
            bound: DEFAULT_BOUND,
        }
    }

    /// Connect to the configured store and heatmap stream
    pub fn from_config(config: &InterchangeConfig) -> Result<Self, StoreError> {
        let store = LogStore::connect(&config.store)?;
        info!(stream = %config.streams.heatmap, "Heatmap publisher ready");
        Ok(Self::new(store, &config.streams.heatmap).with_bound(config.publish.bound))
    }

    /// Set the number of entries kept by [`send`](Self::send)
    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = bound;
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Publish a heatmap, keeping about the publisher's bound of entries
    pub fn send(&self, heatmap: &Heatmap) -> bool {
        self.send_with_bound(heatmap, self.bound)
    }

    #[instrument(skip(self, heatmap), fields(stream = %self.stream, blobs = heatmap.heatmap.len()))]
    pub fn send_with_bound(&self, heatmap: &Heatmap, bound: usize) -> bool {
        publish(&self.store, &self.stream, heatmap, bound)
    }

    /// A consumer of this publisher's stream on its own store connection
    pub fn subscriber(&self) -> Result<FrameConsumer<Heatmap>, StoreError> {
        Ok(FrameConsumer::new(self.store.reopen()?, self.stream.clone()))
    }
}
