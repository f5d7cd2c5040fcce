//! Bounded, append-only stream log.
//!
//! A stream is a named log of flat `string -> string` entries. Appends trim
//! the stream to roughly `bound` entries; reads block until an entry newer
//! than the caller's cursor shows up or the timeout elapses. There are no
//! consumer groups: every cursor observes every retained entry.
//!
//! [`LogBackend`] is the fallible seam implemented by [`RedisBackend`] and
//! [`MemoryBackend`]. [`LogStore`] wraps a backend and turns its failures
//! into the `false` / unchanged-cursor results producers and consumers
//! expect, logging each one.

mod memory;
mod redis_streams;

pub use self::memory::MemoryBackend;
pub use self::redis_streams::RedisBackend;

use crate::config::{BackendKind, StoreConfig};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Flat field mapping stored in one entry
pub type Fields = BTreeMap<String, String>;

/// Errors raised by a log backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to connect to log store at {address}: {message}")]
    Connection { address: String, message: String },

    #[error("Failed to append to stream {stream}: {message}")]
    Append { stream: String, message: String },

    #[error("Failed to read from stream {stream}: {message}")]
    Read { stream: String, message: String },

    #[error("Invalid stream entry id: {0}")]
    InvalidId(String),
}

/// Store-assigned entry id, `<milliseconds>-<sequence>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId {
    pub millis: u64,
    pub seq: u64,
}

impl EntryId {
    /// The id that sorts before every real entry
    pub const ZERO: EntryId = EntryId { millis: 0, seq: 0 };

    pub fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for EntryId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidId(s.to_string());
        let (millis, seq) = match s.split_once('-') {
            Some((millis, seq)) => (millis, seq),
            None => (s, "0"),
        };
        Ok(Self {
            millis: millis.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

/// A consumer's position in a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamCursor {
    /// `$`: only entries appended after the read begins
    #[default]
    Latest,
    /// `0-0`: from the oldest retained entry
    Beginning,
    /// After a specific entry
    After(EntryId),
}

impl StreamCursor {
    pub const LATEST: &'static str = "$";
    pub const BEGINNING: &'static str = "0-0";
}

impl fmt::Display for StreamCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamCursor::Latest => f.write_str(Self::LATEST),
            StreamCursor::Beginning => f.write_str(Self::BEGINNING),
            StreamCursor::After(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for StreamCursor {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::LATEST => Ok(StreamCursor::Latest),
            Self::BEGINNING => Ok(StreamCursor::Beginning),
            other => other.parse().map(StreamCursor::After),
        }
    }
}

impl From<EntryId> for StreamCursor {
    fn from(id: EntryId) -> Self {
        StreamCursor::After(id)
    }
}

/// One entry read back from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: EntryId,
    pub fields: Fields,
}

impl StreamEntry {
    /// Get a field value
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }
}

/// Fallible operations every log store implementation provides
#[cfg_attr(test, mockall::automock)]
pub trait LogBackend: Send + Sync {
    /// Append one entry, trimming the stream to approximately `bound` entries
    fn append(&self, stream: &str, fields: &Fields, bound: usize) -> Result<EntryId, StoreError>;

    /// Block up to `timeout` for entries newer than `cursor`, returning at most `count`.
    /// A zero timeout polls without blocking.
    fn read(
        &self,
        stream: &str,
        cursor: StreamCursor,
        timeout: Duration,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError>;

    /// Id of the newest entry, if the stream has any
    fn last_id(&self, stream: &str) -> Result<Option<EntryId>, StoreError>;
}

/// Result of a [`LogStore::read`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBatch {
    pub entries: Vec<StreamEntry>,
    /// Id of the last entry read, or the caller's cursor when nothing was read
    pub cursor: StreamCursor,
}

/// Shared handle on a log backend
///
/// Cloning is cheap; clones talk to the same backend.
#[derive(Clone)]
pub struct LogStore {
    backend: Arc<dyn LogBackend>,
    /// Set when opened from configuration, so the connection can be reopened
    config: Option<StoreConfig>,
}

impl fmt::Debug for LogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStore").finish_non_exhaustive()
    }
}

impl LogStore {
    /// Wrap an already constructed backend
    pub fn new(backend: impl LogBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            config: None,
        }
    }

    /// Open the backend selected by the configuration
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        info!(backend = config.backend.as_str(), "Opening log store");
        let store = match config.backend {
            BackendKind::Redis => Self::new(RedisBackend::connect(config)?),
            BackendKind::Memory => Self::new(MemoryBackend::new()),
        };
        Ok(Self {
            config: Some(config.clone()),
            ..store
        })
    }

    /// Handle on the same streams that does not share this one's connection.
    ///
    /// A blocking read holds its connection for the whole timeout, so a
    /// consumer and a producer in one process each need their own. A store
    /// opened from a Redis configuration connects again; in-process and
    /// hand-built stores are shared as they are.
    pub fn reopen(&self) -> Result<Self, StoreError> {
        match &self.config {
            Some(config) if config.backend == BackendKind::Redis => Self::connect(config),
            _ => Ok(self.clone()),
        }
    }

    /// In-process store, mainly for tests and single-process pipelines
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Append one entry to `stream`, keeping roughly `bound` entries.
    ///
    /// Returns `false` when the backend fails; the failure is logged.
    #[instrument(skip_all, fields(stream = %stream, bound = bound))]
    pub fn append(&self, stream: &str, fields: &Fields, bound: usize) -> bool {
        // The entry being appended is always retained
        let bound = bound.max(1);
        match self.backend.append(stream, fields, bound) {
            Ok(id) => {
                debug!(%id, "Appended entry");
                true
            }
            Err(e) => {
                error!("Error writing to stream: {}", e);
                false
            }
        }
    }

    /// Read up to `count` entries newer than `cursor`, blocking up to `timeout`.
    ///
    /// On timeout or backend failure the batch is empty and the cursor is
    /// returned unchanged.
    #[instrument(skip(self, cursor), fields(cursor = %cursor))]
    pub fn read(
        &self,
        stream: &str,
        cursor: StreamCursor,
        timeout: Duration,
        count: usize,
    ) -> ReadBatch {
        match self.backend.read(stream, cursor, timeout, count) {
            Ok(entries) => {
                let cursor = entries
                    .last()
                    .map(|entry| StreamCursor::After(entry.id))
                    .unwrap_or(cursor);
                ReadBatch { entries, cursor }
            }
            Err(e) => {
                error!("Error reading from stream: {}", e);
                ReadBatch {
                    entries: Vec::new(),
                    cursor,
                }
            }
        }
    }

    /// Resolve "now" to a concrete cursor.
    ///
    /// A consumer that pins this cursor before a producer sends is guaranteed
    /// to see the new entry, which `$` cannot promise. An empty stream (or a
    /// backend failure, which is logged) yields `0-0`.
    pub fn latest_cursor(&self, stream: &str) -> StreamCursor {
        match self.backend.last_id(stream) {
            Ok(Some(id)) => StreamCursor::After(id),
            Ok(None) => StreamCursor::Beginning,
            Err(e) => {
                error!(stream, "Error resolving stream tail: {}", e);
                StreamCursor::Beginning
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(millis: u64, seq: u64) -> StreamEntry {
        StreamEntry {
            id: EntryId::new(millis, seq),
            fields: Fields::from([("data".to_string(), "{}".to_string())]),
        }
    }

    #[test]
    fn test_cursor_literals() {
        assert_eq!("$".parse::<StreamCursor>().unwrap(), StreamCursor::Latest);
        assert_eq!("0-0".parse::<StreamCursor>().unwrap(), StreamCursor::Beginning);
        assert_eq!(
            "1700000000000-3".parse::<StreamCursor>().unwrap(),
            StreamCursor::After(EntryId::new(1_700_000_000_000, 3))
        );
        assert_eq!(StreamCursor::Latest.to_string(), "$");
        assert_eq!(StreamCursor::Beginning.to_string(), "0-0");
        assert!("abc-1".parse::<StreamCursor>().is_err());
    }

    #[test]
    fn test_entry_ids_order_by_time_then_sequence() {
        assert!(EntryId::new(5, 9) < EntryId::new(6, 0));
        assert!(EntryId::new(6, 0) < EntryId::new(6, 1));
        assert_eq!("42".parse::<EntryId>().unwrap(), EntryId::new(42, 0));
    }

    #[test]
    fn test_append_failure_returns_false() {
        let mut backend = MockLogBackend::new();
        backend.expect_append().returning(|stream, _, _| {
            Err(StoreError::Append {
                stream: stream.to_string(),
                message: "connection refused".to_string(),
            })
        });

        let store = LogStore::new(backend);
        assert!(!store.append("detection", &Fields::new(), 1000));
    }

    #[test]
    fn test_read_failure_keeps_cursor() {
        let mut backend = MockLogBackend::new();
        backend.expect_read().returning(|stream, _, _, _| {
            Err(StoreError::Read {
                stream: stream.to_string(),
                message: "broken pipe".to_string(),
            })
        });

        let store = LogStore::new(backend);
        let cursor = StreamCursor::After(EntryId::new(10, 2));
        let batch = store.read("detection", cursor, Duration::from_millis(10), 1);

        assert!(batch.entries.is_empty());
        assert_eq!(batch.cursor, cursor);
    }

    #[test]
    fn test_read_advances_to_last_entry() {
        let mut backend = MockLogBackend::new();
        backend
            .expect_read()
            .returning(|_, _, _, _| Ok(vec![entry(1, 0), entry(1, 1)]));

        let store = LogStore::new(backend);
        let batch = store.read("detection", StreamCursor::Beginning, Duration::ZERO, 2);

        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.cursor, StreamCursor::After(EntryId::new(1, 1)));
    }

    #[test]
    fn test_latest_cursor_falls_back_to_beginning() {
        let mut backend = MockLogBackend::new();
        backend.expect_last_id().returning(|_| Ok(None));
        let store = LogStore::new(backend);
        assert_eq!(store.latest_cursor("heatmap"), StreamCursor::Beginning);
    }

    #[test]
    fn test_zero_bound_is_raised_to_one() {
        let mut backend = MockLogBackend::new();
        backend
            .expect_append()
            .withf(|_, _, bound| *bound == 1)
            .times(1)
            .returning(|_, _, _| Ok(EntryId::new(1, 0)));

        let store = LogStore::new(backend);
        assert!(store.append("detection", &Fields::new(), 0));
    }

    #[test]
    fn test_reopened_memory_store_shares_streams() {
        let config = StoreConfig {
            backend: BackendKind::Memory,
            ..StoreConfig::default()
        };
        let store = LogStore::connect(&config).unwrap();
        let reader = store.reopen().unwrap();

        let start = reader.latest_cursor("detection");
        let fields = Fields::from([("data".to_string(), "{}".to_string())]);
        assert!(store.append("detection", &fields, 10));

        let batch = reader.read("detection", start, Duration::from_millis(20), 1);
        assert_eq!(batch.entries.len(), 1);
    }
}
