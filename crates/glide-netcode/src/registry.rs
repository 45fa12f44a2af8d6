//! Batch registry - entities that send on a shared cadence
//!
//! Entities with `sync_send_interval` enabled join this ordered set when
//! they are enabled and leave it when disabled. Only the first member (the
//! leader) runs the interval check. When it fires, every member sends on
//! that same tick, so a whole fleet of snapshots carries timestamps from one
//! frame.
//!
//! Membership only changes between ticks: the manager mutates it from
//! spawn/enable/disable, never while dispatching a batch.

use crate::schedule::should_send_now;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Unique identifier for a synchronized entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Ordered, duplicate-free set of batch members
#[derive(Debug, Clone)]
pub struct SyncRegistry {
    members: IndexSet<EntityId>,
    /// When the batch last went out
    ///
    /// Kept here rather than on the leader, so a leader that skips its own
    /// send (move gating) does not make the batch fire every frame.
    last_dispatch: f64,
}

impl SyncRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            members: IndexSet::new(),
            last_dispatch: f64::NEG_INFINITY,
        }
    }

    /// Append an entity; returns false if it was already a member
    pub fn register(&mut self, id: EntityId) -> bool {
        let added = self.members.insert(id);
        if added {
            debug!(entity = %id, position = self.members.len() - 1, "joined send batch");
        }
        added
    }

    /// Remove an entity, keeping the order of the rest
    pub fn unregister(&mut self, id: EntityId) -> bool {
        let removed = self.members.shift_remove(&id);
        if removed {
            debug!(entity = %id, "left send batch");
        }
        removed
    }

    /// The entity whose interval drives the batch
    pub fn leader(&self) -> Option<EntityId> {
        self.members.first().copied()
    }

    /// Check if `id` is the leader
    pub fn is_leader(&self, id: EntityId) -> bool {
        self.leader() == Some(id)
    }

    /// Check membership
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    /// Members in registration order
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().copied()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if there are no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the batch is due at `now` with the leader's `interval`
    pub fn is_due(&self, now: f64, interval: f64) -> bool {
        should_send_now(now, self.last_dispatch, interval)
    }

    /// Record that the batch went out at `now`
    pub fn record_dispatch(&mut self, now: f64) {
        self.last_dispatch = now;
    }

    /// When the batch last went out
    pub fn last_dispatch(&self) -> f64 {
        self.last_dispatch
    }
}

impl Default for SyncRegistry {
    fn default() -> Self {
        Self::new()
    }
}
