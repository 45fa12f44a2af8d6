//! Glide Buffer - Sorted, bounded store of received snapshots
//!
//! This crate provides the per-direction snapshot buffer used by the
//! interpolation engine.
//!
//! # Features
//!
//! - **Bounded memory**: insertions past the size limit are refused, never evicting
//! - **Sorted**: entries are kept ascending by remote timestamp, keys unique
//! - **No rewinding**: anything at or before the oldest entry is dropped
//!
//! # Example
//!
//! ```rust
//! use glide_buffer::{InsertOutcome, TimeBuffer};
//! use glide_core::{Snapshot, Transform};
//!
//! let mut buffer = TimeBuffer::new(64);
//!
//! let sample = |ts| Snapshot::new(ts, ts, Transform::IDENTITY);
//! assert_eq!(buffer.insert(sample(1.0)), InsertOutcome::Inserted);
//! assert_eq!(buffer.insert(sample(0.5)), InsertOutcome::Stale);
//! assert_eq!(buffer.insert(sample(2.0)), InsertOutcome::Inserted);
//!
//! let (start, goal) = buffer.interval().unwrap();
//! assert_eq!(start.remote_timestamp, 1.0);
//! assert_eq!(goal.remote_timestamp, 2.0);
//! ```

use glide_core::Snapshot;
use tracing::trace;

/// Default maximum number of buffered snapshots
pub const DEFAULT_BUFFER_SIZE_LIMIT: usize = 64;

/// What happened to a snapshot handed to [`TimeBuffer::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Added as a new entry
    Inserted,
    /// Overwrote an existing entry with the same timestamp
    Replaced,
    /// Refused because the buffer is at its size limit
    Full,
    /// Refused because it is not newer than the oldest entry
    Stale,
    /// Refused because the timestamp is NaN or infinite
    InvalidTimestamp,
}

impl InsertOutcome {
    /// True if the buffer now holds the snapshot
    pub fn is_accepted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted | InsertOutcome::Replaced)
    }
}

/// Snapshots for one direction, sorted by remote timestamp
///
/// The first two entries form the interval currently being interpolated.
/// Capacity is a hard bound: a flooding sender fills the buffer and then
/// gets its snapshots refused until the consumer drains some.
#[derive(Debug, Clone)]
pub struct TimeBuffer {
    /// Entries ascending by `remote_timestamp`, no duplicates
    entries: Vec<Snapshot>,
    /// Maximum number of entries
    limit: usize,
}

impl TimeBuffer {
    /// Create a buffer holding at most `limit` snapshots
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::with_capacity(limit.min(DEFAULT_BUFFER_SIZE_LIMIT)),
            limit,
        }
    }

    /// Insert a snapshot, keeping the buffer sorted
    ///
    /// Checks, in order:
    /// 1. at or above the size limit: refused
    /// 2. non-finite timestamp: refused
    /// 3. not newer than the current oldest entry: refused as stale
    /// 4. same timestamp as an existing entry: that entry is overwritten
    pub fn insert(&mut self, snapshot: Snapshot) -> InsertOutcome {
        let ts = snapshot.remote_timestamp;

        if self.entries.len() >= self.limit {
            trace!(timestamp = ts, limit = self.limit, "buffer full, snapshot refused");
            return InsertOutcome::Full;
        }

        if !ts.is_finite() {
            return InsertOutcome::InvalidTimestamp;
        }

        if let Some(first) = self.entries.first() {
            if first.remote_timestamp >= ts {
                trace!(timestamp = ts, oldest = first.remote_timestamp, "stale snapshot dropped");
                return InsertOutcome::Stale;
            }
        }

        let index = self.entries.partition_point(|s| s.remote_timestamp < ts);
        match self.entries.get_mut(index) {
            Some(existing) if existing.remote_timestamp == ts => {
                *existing = snapshot;
                InsertOutcome::Replaced
            }
            _ => {
                self.entries.insert(index, snapshot);
                InsertOutcome::Inserted
            }
        }
    }

    /// Oldest entry (start of the current interval)
    pub fn first(&self) -> Option<&Snapshot> {
        self.entries.first()
    }

    /// Second-oldest entry (goal of the current interval)
    pub fn second(&self) -> Option<&Snapshot> {
        self.entries.get(1)
    }

    /// The current interpolation interval, if at least two entries exist
    pub fn interval(&self) -> Option<(&Snapshot, &Snapshot)> {
        match self.entries.as_slice() {
            [start, goal, ..] => Some((start, goal)),
            _ => None,
        }
    }

    /// Remove and return the oldest entry
    pub fn pop_first(&mut self) -> Option<Snapshot> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Get the entry at `index` in timestamp order
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index)
    }

    /// All entries, oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of buffered snapshots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if further inserts would be refused for capacity
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.limit
    }

    /// Maximum number of entries
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the size limit
    ///
    /// Existing entries beyond a lowered limit are kept; the interpolation
    /// engine drains them and inserts resume once below the new limit.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Get statistics about the buffer
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            limit: self.limit,
            count: self.entries.len(),
            oldest_timestamp: self.entries.first().map(|s| s.remote_timestamp),
            newest_timestamp: self.entries.last().map(|s| s.remote_timestamp),
        }
    }
}

impl Default for TimeBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE_LIMIT)
    }
}

/// Statistics about a time buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferStats {
    /// Maximum number of entries
    pub limit: usize,
    /// Current number of entries
    pub count: usize,
    /// Remote timestamp of the oldest entry
    pub oldest_timestamp: Option<f64>,
    /// Remote timestamp of the newest entry
    pub newest_timestamp: Option<f64>,
}

impl BufferStats {
    /// Seconds of sender time covered by the buffer
    pub fn span(&self) -> f64 {
        match (self.oldest_timestamp, self.newest_timestamp) {
            (Some(oldest), Some(newest)) => newest - oldest,
            _ => 0.0,
        }
    }

    /// Get the fill percentage (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f32 {
        if self.limit == 0 {
            return 1.0;
        }
        self.count as f32 / self.limit as f32
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use glide_core::Transform;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2_000))]

        #[test]
        fn length_never_exceeds_limit(
            limit in 0usize..32,
            stamps in prop::collection::vec(0u32..500, 0..200),
        ) {
            let mut buffer = TimeBuffer::new(limit);
            for ts in stamps {
                buffer.insert(Snapshot::new(ts as f64 * 0.1, 0.0, Transform::IDENTITY));
                prop_assert!(buffer.len() <= limit);
            }
        }

        #[test]
        fn entries_stay_strictly_sorted(stamps in prop::collection::vec(0u32..500, 0..200)) {
            let mut buffer = TimeBuffer::new(64);
            for ts in stamps {
                buffer.insert(Snapshot::new(ts as f64 * 0.1, 0.0, Transform::IDENTITY));
                let keys: Vec<f64> = buffer.iter().map(|s| s.remote_timestamp).collect();
                prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
            }
        }

        #[test]
        fn stale_insert_is_noop(
            stamps in prop::collection::vec(1u32..500, 1..64),
            back in 0u32..100,
        ) {
            let mut buffer = TimeBuffer::new(64);
            for ts in stamps {
                buffer.insert(Snapshot::new(ts as f64, 0.0, Transform::IDENTITY));
            }
            let before: Vec<f64> = buffer.iter().map(|s| s.remote_timestamp).collect();
            let oldest = before[0];

            let outcome =
                buffer.insert(Snapshot::new(oldest - back as f64, 0.0, Transform::IDENTITY));
            prop_assert_eq!(outcome, InsertOutcome::Stale);

            let after: Vec<f64> = buffer.iter().map(|s| s.remote_timestamp).collect();
            prop_assert_eq!(before, after);
        }
    }
}
