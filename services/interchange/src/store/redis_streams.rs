//! Redis Streams log backend.
//!
//! `append` is `XADD <stream> MAXLEN ~ <bound> * ...`, `read` is
//! `XREAD COUNT <n> BLOCK <ms> STREAMS <stream> <cursor>` and `last_id` is
//! `XREVRANGE <stream> + - COUNT 1`.

use super::{EntryId, Fields, LogBackend, StoreError, StreamCursor, StreamEntry};
use crate::config::StoreConfig;
use parking_lot::Mutex;
use redis::streams::{StreamId, StreamMaxlen, StreamRangeReply, StreamReadOptions, StreamReadReply};
use redis::{Commands, Connection};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Redis connection used as a stream log
///
/// The connection is opened when the backend is built and held for its
/// lifetime. There is no reconnect: once the connection breaks, every call
/// fails and the [`LogStore`](super::LogStore) wrapper reports `false` /
/// empty reads. A blocking read holds the connection for its whole timeout,
/// so producers and consumers should each open their own backend
/// ([`LogStore::reopen`](super::LogStore::reopen)).
pub struct RedisBackend {
    connection: Mutex<Connection>,
    address: String,
}

impl RedisBackend {
    /// Open a connection to the configured server
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let address = config.url();
        info!("Connecting to redis at {}", address);

        let connection_error = |e: redis::RedisError| StoreError::Connection {
            address: address.clone(),
            message: e.to_string(),
        };

        let client = redis::Client::open(address.as_str()).map_err(connection_error)?;
        let connection = client
            .get_connection_with_timeout(config.connect_timeout())
            .map_err(connection_error)?;

        // BLOCK does the waiting; a socket timeout would cut it short
        connection.set_read_timeout(None).map_err(connection_error)?;

        Ok(Self {
            connection: Mutex::new(connection),
            address,
        })
    }

    /// Server address this backend is connected to
    pub fn address(&self) -> &str {
        &self.address
    }
}

fn convert_entry(stream: &str, raw: StreamId) -> Result<StreamEntry, StoreError> {
    let id: EntryId = raw.id.parse()?;
    let mut fields = Fields::new();
    for (name, value) in raw.map {
        match redis::from_redis_value::<String>(&value) {
            Ok(text) => {
                fields.insert(name, text);
            }
            Err(e) => {
                warn!(stream, %id, field = %name, "Skipping non-text field: {}", e);
            }
        }
    }
    Ok(StreamEntry { id, fields })
}

impl LogBackend for RedisBackend {
    fn append(&self, stream: &str, fields: &Fields, bound: usize) -> Result<EntryId, StoreError> {
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        let id: String = self
            .connection
            .lock()
            .xadd_maxlen(stream, StreamMaxlen::Approx(bound), "*", items.as_slice())
            .map_err(|e| StoreError::Append {
                stream: stream.to_string(),
                message: e.to_string(),
            })?;

        id.parse()
    }

    fn read(
        &self,
        stream: &str,
        cursor: StreamCursor,
        timeout: Duration,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let mut options = StreamReadOptions::default().count(count.max(1));
        // BLOCK 0 means "forever" to redis; a zero timeout here is a poll
        if !timeout.is_zero() {
            options = options.block(timeout.as_millis().max(1) as usize);
        }

        let cursor = cursor.to_string();
        let reply: Option<StreamReadReply> = self
            .connection
            .lock()
            .xread_options(&[stream], &[cursor.as_str()], &options)
            .map_err(|e| StoreError::Read {
                stream: stream.to_string(),
                message: e.to_string(),
            })?;

        let Some(reply) = reply else {
            debug!(stream, "Read timed out");
            return Ok(Vec::new());
        };

        reply
            .keys
            .into_iter()
            .filter(|key| key.key == stream)
            .flat_map(|key| key.ids)
            .map(|raw| convert_entry(stream, raw))
            .collect()
    }

    fn last_id(&self, stream: &str) -> Result<Option<EntryId>, StoreError> {
        let reply: StreamRangeReply = self
            .connection
            .lock()
            .xrevrange_count(stream, "+", "-", 1)
            .map_err(|e| StoreError::Read {
                stream: stream.to_string(),
                message: e.to_string(),
            })?;

        reply
            .ids
            .into_iter()
            .next()
            .map(|raw| raw.id.parse())
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::Value;
    use std::collections::HashMap;

    #[test]
    fn test_convert_entry_keeps_text_fields() {
        let raw = StreamId {
            id: "1700000000000-1".to_string(),
            map: HashMap::from([
                ("data".to_string(), Value::Data(b"{\"id\":1}".to_vec())),
                ("flag".to_string(), Value::Nil),
            ]),
        };

        let entry = convert_entry("detection", raw).unwrap();
        assert_eq!(entry.id, EntryId::new(1_700_000_000_000, 1));
        assert_eq!(entry.field("data"), Some("{\"id\":1}"));
        assert!(entry.field("flag").is_none());
    }

    #[test]
    fn test_convert_entry_rejects_bad_id() {
        let raw = StreamId {
            id: "not-an-id".to_string(),
            map: HashMap::new(),
        };
        assert!(matches!(
            convert_entry("detection", raw),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let config = StoreConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_ms: 200,
            ..Default::default()
        };
        assert!(matches!(
            RedisBackend::connect(&config),
            Err(StoreError::Connection { .. })
        ));
    }
}
