//! Metropolis minimal schema encoder.
//!
//! Turns labelled bounding boxes into a [`MetropolisRecord`] JSON document
//! and, when a sink is attached, appends it to a stream. Unlike the frame
//! publishers there is no validation step and the append is fire-and-forget.
//! The only error is a caller mistake: labels and boxes of different length.

use crate::config::InterchangeConfig;
use crate::models::{BoundingBox, MetropolisRecord, METROPOLIS_VERSION};
use crate::publisher::DEFAULT_BOUND;
use crate::store::{Fields, LogStore, StoreError};
use crate::DATA_FIELD;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while encoding
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("objects and bboxes not the same length: {objects} objects, {bboxes} bboxes")]
    LengthMismatch { objects: usize, bboxes: usize },

    #[error("Failed to serialize metropolis record: {0}")]
    Serialization(#[from] serde_json::Error),
}

struct Sink {
    store: LogStore,
    stream: String,
}

/// Encodes detections in the metropolis minimal schema
///
/// Frame ids come from an internal counter advanced through `&mut self`.
pub struct MetropolisEncoder {
    sensor_id: i64,
    image_size: (i64, i64),
    sink: Option<Sink>,
    bound: usize,
    frame_counter: u64,
}

impl MetropolisEncoder {
    /// Encoder that only returns documents
    pub fn new(sensor_id: i64, image_size: (i64, i64)) -> Self {
        Self {
            sensor_id,
            image_size,
            sink: None,
            bound: DEFAULT_BOUND,
            frame_counter: 0,
        }
    }

    /// Encoder appending to the configured metropolis stream
    pub fn from_config(config: &InterchangeConfig) -> Result<Self, StoreError> {
        let store = LogStore::connect(&config.store)?;
        info!(stream = %config.streams.metropolis, "Metropolis encoder ready");
        Ok(Self::new(config.publish.sensor_id, config.publish.image_size)
            .with_sink(store, &config.streams.metropolis)
            .with_bound(config.publish.bound))
    }

    /// Also append every encoded document to `stream`
    pub fn with_sink(mut self, store: LogStore, stream: impl Into<String>) -> Self {
        self.sink = Some(Sink {
            store,
            stream: stream.into(),
        });
        self
    }

    /// Approximate number of records the sink stream keeps
    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = bound;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Encode labelled boxes using the next frame id
    pub fn encode<S: AsRef<str>>(
        &mut self,
        objects: &[S],
        bboxes: &[BoundingBox],
    ) -> Result<String, EncodeError> {
        self.generate(objects, bboxes, None)
    }

    /// Encode labelled boxes under an explicit frame id; the counter is untouched
    pub fn encode_with_id<S: AsRef<str>>(
        &mut self,
        objects: &[S],
        bboxes: &[BoundingBox],
        frame_id: u64,
    ) -> Result<String, EncodeError> {
        self.generate(objects, bboxes, Some(frame_id))
    }

    fn generate<S: AsRef<str>>(
        &mut self,
        objects: &[S],
        bboxes: &[BoundingBox],
        frame_id: Option<u64>,
    ) -> Result<String, EncodeError> {
        if objects.len() != bboxes.len() {
            return Err(EncodeError::LengthMismatch {
                objects: objects.len(),
                bboxes: bboxes.len(),
            });
        }

        let id = frame_id.unwrap_or_else(|| {
            let id = self.frame_counter;
            self.frame_counter += 1;
            id
        });

        let record = MetropolisRecord {
            version: METROPOLIS_VERSION.to_string(),
            id,
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            sensor_id: self.sensor_id,
            objects: objects
                .iter()
                .zip(bboxes)
                .map(|(label, bbox)| MetropolisRecord::object(label.as_ref(), *bbox))
                .collect(),
            width: self.image_size.0,
            height: self.image_size.1,
        };

        let json = serde_json::to_string(&record)?;

        if let Some(sink) = &self.sink {
            let fields = Fields::from([(DATA_FIELD.to_string(), json.clone())]);
            if sink.store.append(&sink.stream, &fields, self.bound) {
                debug!(stream = %sink.stream, id, "Metropolis record appended");
            } else {
                warn!(stream = %sink.stream, id, "Metropolis record not appended");
            }
        }

        Ok(json)
    }
}
