//! Frame consumers.
//!
//! A consumer performs one blocking read per call, decodes the entry's `data`
//! field and validates it. The caller holds the cursor and passes it back on
//! the next call.

use crate::config::InterchangeConfig;
use crate::models::{Frame, Heatmap};
use crate::schema::{self, CodecError, Schema};
use crate::store::{LogStore, StoreError, StreamCursor, StreamEntry};
use crate::DATA_FIELD;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// How long [`FrameConsumer::next_after`] blocks unless configured otherwise
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Why an entry read from the stream could not be turned into a record
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Entry {id} has no '{field}' field")]
    MissingField { id: String, field: &'static str },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Reads records of type `T` from one stream
pub struct FrameConsumer<T> {
    store: LogStore,
    stream: String,
    read_timeout: Duration,
    _record: PhantomData<fn() -> T>,
}

/// Consumer of direction frames
pub type DirectionConsumer = FrameConsumer<Frame>;

/// Consumer of heatmaps
pub type HeatmapConsumer = FrameConsumer<Heatmap>;

impl<T> Clone for FrameConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            stream: self.stream.clone(),
            read_timeout: self.read_timeout,
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for FrameConsumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameConsumer")
            .field("stream", &self.stream)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl<T: Schema> FrameConsumer<T> {
    pub fn new(store: LogStore, stream: impl Into<String>) -> Self {
        Self {
            store,
            stream: stream.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            _record: PhantomData,
        }
    }

    /// Set how long [`next_after`](Self::next_after) blocks
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Cursor pinned at the current end of the stream
    pub fn latest_cursor(&self) -> StreamCursor {
        self.store.latest_cursor(&self.stream)
    }

    /// Block up to `timeout` for the next record after `cursor`.
    ///
    /// Returns `(None, cursor)` on timeout or store failure. When an entry is
    /// read but cannot be decoded or fails validation, the result is
    /// `(None, <id of that entry>)`: the cursor moves past the bad entry so
    /// the next call does not read it again.
    #[instrument(skip(self, cursor), fields(stream = %self.stream, cursor = %cursor))]
    pub fn get(&self, timeout: Duration, cursor: StreamCursor) -> (Option<T>, StreamCursor) {
        let batch = self.store.read(&self.stream, cursor, timeout, 1);

        let Some(entry) = batch.entries.first() else {
            debug!("No entry before timeout");
            return (None, batch.cursor);
        };

        match Self::decode_entry(entry) {
            Ok(record) => (Some(record), batch.cursor),
            Err(e) => {
                warn!(id = %entry.id, "Error reading from stream {}: {}", self.stream, e);
                (None, batch.cursor)
            }
        }
    }

    /// [`get`](Self::get) with the consumer's read timeout
    pub fn next_after(&self, cursor: StreamCursor) -> (Option<T>, StreamCursor) {
        self.get(self.read_timeout, cursor)
    }

    fn decode_entry(entry: &StreamEntry) -> Result<T, ConsumerError> {
        let data = entry
            .field(DATA_FIELD)
            .ok_or_else(|| ConsumerError::MissingField {
                id: entry.id.to_string(),
                field: DATA_FIELD,
            })?;

        Ok(schema::decode(data)?)
    }
}

impl DirectionConsumer {
    /// Connect to the configured store and direction stream
    pub fn direction_from_config(config: &InterchangeConfig) -> Result<Self, StoreError> {
        let store = LogStore::connect(&config.store)?;
        Ok(Self::new(store, &config.streams.direction).with_read_timeout(config.read_timeout()))
    }
}

impl HeatmapConsumer {
    /// Connect to the configured store and heatmap stream
    pub fn heatmap_from_config(config: &InterchangeConfig) -> Result<Self, StoreError> {
        let store = LogStore::connect(&config.store)?;
        Ok(Self::new(store, &config.streams.heatmap).with_read_timeout(config.read_timeout()))
    }
}
