//! In-process log backend.
//!
//! Mirrors the stream semantics of the Redis backend closely enough that the
//! publishers and consumers behave the same on either: ids are
//! `<unix-ms>-<seq>` and strictly increasing, trimming is approximate, and
//! reads block on a condition variable until an entry lands or the deadline
//! passes.

use super::{EntryId, Fields, LogBackend, StoreError, StreamCursor, StreamEntry};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Default)]
struct Stream {
    entries: VecDeque<StreamEntry>,
    /// Survives trimming so ids never go backwards
    last_id: EntryId,
}

impl Stream {
    fn next_id(&self) -> EntryId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        if now > self.last_id.millis {
            EntryId::new(now, 0)
        } else {
            EntryId::new(self.last_id.millis, self.last_id.seq + 1)
        }
    }

    /// Drop the oldest entries once the stream overshoots `bound` by more than the slack
    fn trim(&mut self, bound: usize) {
        let bound = bound.max(1);
        let slack = (bound / 10).max(1);
        if self.entries.len() > bound + slack {
            let excess = self.entries.len() - bound;
            self.entries.drain(..excess);
        }
    }

    fn after(&self, id: EntryId, count: usize) -> Vec<StreamEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.id > id)
            .take(count)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct Shared {
    streams: Mutex<HashMap<String, Stream>>,
    appended: Condvar,
}

/// Stream log held in process memory
///
/// Clones share the same streams, so a publisher and a consumer built from
/// clones of one backend see each other's entries.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently retained in `stream`
    pub fn len(&self, stream: &str) -> usize {
        self.shared
            .streams
            .lock()
            .get(stream)
            .map(|s| s.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, stream: &str) -> bool {
        self.len(stream) == 0
    }
}

impl LogBackend for MemoryBackend {
    fn append(&self, stream: &str, fields: &Fields, bound: usize) -> Result<EntryId, StoreError> {
        let mut streams = self.shared.streams.lock();
        let log = streams.entry(stream.to_string()).or_default();

        let id = log.next_id();
        log.entries.push_back(StreamEntry {
            id,
            fields: fields.clone(),
        });
        log.last_id = id;
        log.trim(bound);

        drop(streams);
        self.shared.appended.notify_all();

        Ok(id)
    }

    fn read(
        &self,
        stream: &str,
        cursor: StreamCursor,
        timeout: Duration,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let deadline = Instant::now() + timeout;
        let count = count.max(1);
        let mut streams = self.shared.streams.lock();

        // `$` is pinned once, when the read begins
        let after = match cursor {
            StreamCursor::Latest => streams
                .get(stream)
                .map(|s| s.last_id)
                .unwrap_or(EntryId::ZERO),
            StreamCursor::Beginning => EntryId::ZERO,
            StreamCursor::After(id) => id,
        };

        loop {
            let entries = streams
                .get(stream)
                .map(|s| s.after(after, count))
                .unwrap_or_default();

            if !entries.is_empty() || Instant::now() >= deadline {
                return Ok(entries);
            }

            self.shared.appended.wait_until(&mut streams, deadline);
        }
    }

    fn last_id(&self, stream: &str) -> Result<Option<EntryId>, StoreError> {
        Ok(self
            .shared
            .streams
            .lock()
            .get(stream)
            .filter(|s| s.last_id != EntryId::ZERO)
            .map(|s| s.last_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn data(value: &str) -> Fields {
        Fields::from([("data".to_string(), value.to_string())])
    }

    #[test]
    fn test_ids_strictly_increase() {
        let backend = MemoryBackend::new();
        let mut previous = EntryId::ZERO;
        for i in 0..50 {
            let id = backend.append("s", &data(&i.to_string()), 1000).unwrap();
            assert!(id > previous);
            previous = id;
        }
    }

    #[test]
    fn test_read_from_beginning_in_append_order() {
        let backend = MemoryBackend::new();
        for value in ["a", "b", "c"] {
            backend.append("s", &data(value), 1000).unwrap();
        }

        let entries = backend
            .read("s", StreamCursor::Beginning, Duration::ZERO, 10)
            .unwrap();
        let values: Vec<_> = entries.iter().filter_map(|e| e.field("data")).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_count_limits_batch() {
        let backend = MemoryBackend::new();
        for value in ["a", "b", "c"] {
            backend.append("s", &data(value), 1000).unwrap();
        }

        let first = backend
            .read("s", StreamCursor::Beginning, Duration::ZERO, 1)
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].field("data"), Some("a"));

        let second = backend
            .read("s", StreamCursor::After(first[0].id), Duration::ZERO, 1)
            .unwrap();
        assert_eq!(second[0].field("data"), Some("b"));
    }

    #[test]
    fn test_latest_ignores_existing_entries() {
        let backend = MemoryBackend::new();
        backend.append("s", &data("old"), 1000).unwrap();

        let entries = backend
            .read("s", StreamCursor::Latest, Duration::from_millis(20), 1)
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_timeout_with_no_data() {
        let backend = MemoryBackend::new();
        let started = Instant::now();
        let entries = backend
            .read("missing", StreamCursor::Beginning, Duration::from_millis(50), 1)
            .unwrap();

        assert!(entries.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_blocked_read_wakes_on_append() {
        let backend = MemoryBackend::new();
        let writer = backend.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            writer.append("s", &data("late"), 1000).unwrap();
        });

        let entries = backend
            .read("s", StreamCursor::Latest, Duration::from_secs(5), 1)
            .unwrap();
        handle.join().unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field("data"), Some("late"));
    }

    #[test]
    fn test_retention_stays_near_bound() {
        let backend = MemoryBackend::new();
        let bound = 100;
        for i in 0..(bound + 57) {
            backend.append("s", &data(&i.to_string()), bound).unwrap();
        }

        let retained = backend.len("s");
        assert!(retained >= bound, "retained {} < bound", retained);
        assert!(retained <= bound + bound / 10, "retained {} entries", retained);

        // The newest entry always survives trimming
        let tail = backend
            .read("s", StreamCursor::Beginning, Duration::ZERO, retained)
            .unwrap();
        assert_eq!(tail.last().and_then(|e| e.field("data")), Some("156"));
    }

    #[test]
    fn test_zero_bound_keeps_newest_entry() {
        let backend = MemoryBackend::new();
        for value in ["a", "b", "c"] {
            backend.append("s", &data(value), 0).unwrap();
        }

        let entries = backend
            .read("s", StreamCursor::Beginning, Duration::ZERO, 10)
            .unwrap();
        assert!(!entries.is_empty());
        assert_eq!(entries.last().and_then(|e| e.field("data")), Some("c"));
    }

    #[test]
    fn test_last_id_survives_trim() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.last_id("s").unwrap(), None);

        let mut last = EntryId::ZERO;
        for i in 0..10 {
            last = backend.append("s", &data(&i.to_string()), 1).unwrap();
        }
        assert_eq!(backend.last_id("s").unwrap(), Some(last));
    }
}
