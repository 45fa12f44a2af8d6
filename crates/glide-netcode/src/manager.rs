//! Sync manager - owns every synchronized entity on one process
//!
//! The manager is the host's single entry point per frame:
//!
//! ```text
//!   network ──▶ receive() ──▶ entity buffers
//!
//!   update(now, delta)
//!     ├─ batch: leader due? ──▶ every batch member sends
//!     ├─ independent: each due entity sends
//!     └─ every entity interpolates and applies its frame
//! ```
//!
//! It also owns the [`SyncRegistry`], so batch membership always matches the
//! set of enabled entities with `sync_send_interval` on.

use crate::network_transform::{
    IgnoreReason, NetworkTransform, ReceiveOutcome, SyncDiagnostics, TeleportOutcome,
};
use crate::registry::{EntityId, SyncRegistry};
use crate::transport::{Channel, Envelope, Transport};
use crate::{Error, Result};
use glide_core::Vec3;
use indexmap::IndexMap;
use tracing::{debug, warn};

/// What one [`SyncManager::update`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sync messages handed to the transport
    pub sent: usize,
    /// Sends that failed to encode or were refused by the transport
    pub failed: usize,
    /// Entities that applied an interpolated frame
    pub interpolated: usize,
    /// The shared batch fired this tick
    pub batch_dispatched: bool,
}

/// Collection of synchronized entities plus the shared send batch
#[derive(Debug, Default)]
pub struct SyncManager {
    entities: IndexMap<EntityId, NetworkTransform>,
    registry: SyncRegistry,
}

impl SyncManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Start managing an entity
    ///
    /// An entity already managed under the same id is replaced and returned.
    pub fn spawn(&mut self, entity: NetworkTransform) -> Option<NetworkTransform> {
        let id = entity.id();
        let previous = self.despawn(id);
        if entity.is_enabled() && entity.config().sync_send_interval {
            self.registry.register(id);
        }
        debug!(entity = %id, mode = ?entity.mode(), "spawned");
        self.entities.insert(id, entity);
        previous
    }

    /// Stop managing an entity and return it
    pub fn despawn(&mut self, id: EntityId) -> Option<NetworkTransform> {
        let entity = self.entities.shift_remove(&id)?;
        self.registry.unregister(id);
        debug!(entity = %id, "despawned");
        Some(entity)
    }

    /// Enable or disable an entity
    ///
    /// A change of state clears the entity's buffers; setting the current
    /// state again leaves them alone. Batch membership follows.
    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> Result<()> {
        let entity = self.entities.get_mut(&id).ok_or(Error::UnknownEntity(id))?;
        if entity.is_enabled() == enabled {
            return Ok(());
        }
        if enabled {
            entity.enable();
            if entity.config().sync_send_interval {
                self.registry.register(id);
            }
        } else {
            entity.disable();
            self.registry.unregister(id);
        }
        Ok(())
    }

    pub fn get(&self, id: EntityId) -> Option<&NetworkTransform> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut NetworkTransform> {
        self.entities.get_mut(&id)
    }

    /// Entities in spawn order
    pub fn iter(&self) -> impl Iterator<Item = &NetworkTransform> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The shared send batch
    pub fn registry(&self) -> &SyncRegistry {
        &self.registry
    }

    /// Diagnostics for one entity
    pub fn diagnostics(&self, id: EntityId) -> Option<SyncDiagnostics> {
        self.entities.get(&id).map(NetworkTransform::diagnostics)
    }

    /// Run one frame: scheduled sends, then interpolation for everyone
    ///
    /// A failed send is logged and counted; the rest of the frame still runs.
    pub fn update<T: Transport>(&mut self, now: f64, delta: f64, transport: &mut T) -> TickReport {
        let mut report = TickReport::default();

        if self.batch_due(now) {
            self.registry.record_dispatch(now);
            report.batch_dispatched = true;
            for id in self.registry.iter() {
                let Some(entity) = self.entities.get_mut(&id) else {
                    continue;
                };
                if entity.config().manual_trigger_send {
                    continue;
                }
                Self::tally(entity.send_sync(now, transport), id, &mut report);
            }
        }

        for (id, entity) in self.entities.iter_mut() {
            Self::tally(entity.send_if_due(now, transport), *id, &mut report);
            if entity.render(now, delta).is_some() {
                report.interpolated += 1;
            }
        }

        report
    }

    /// Whether the leader's interval has elapsed since the last batch
    fn batch_due(&self, now: f64) -> bool {
        let Some(leader) = self.registry.leader().and_then(|id| self.entities.get(&id)) else {
            return false;
        };
        let config = leader.config();
        leader.is_enabled()
            && !config.manual_trigger_send
            && self.registry.is_due(now, config.send_interval)
    }

    fn tally(result: Result<bool>, id: EntityId, report: &mut TickReport) {
        match result {
            Ok(true) => report.sent += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(entity = %id, error = %e, "sync send failed");
                report.failed += 1;
            }
        }
    }

    /// Route an inbound message to its entity
    pub fn receive<T: Transport>(
        &mut self,
        channel: Channel,
        envelope: &Envelope,
        now: f64,
        transport: &mut T,
    ) -> ReceiveOutcome {
        let id = envelope.message.entity();
        match self.entities.get_mut(&id) {
            Some(entity) => entity.receive(channel, envelope, now, transport),
            None => {
                debug!(entity = %id, ?channel, "message for unknown entity");
                ReceiveOutcome::Ignored(IgnoreReason::UnknownEntity)
            }
        }
    }

    /// Send one entity's state now, regardless of its schedule
    ///
    /// Returns `Ok(false)` if the entity's current mode does not send or
    /// move gating held the sample back.
    pub fn trigger_send<T: Transport>(
        &mut self,
        id: EntityId,
        now: f64,
        transport: &mut T,
    ) -> Result<bool> {
        let entity = self.entities.get_mut(&id).ok_or(Error::UnknownEntity(id))?;
        if !entity.is_enabled() {
            return Ok(false);
        }
        entity.send_sync(now, transport)
    }

    /// Send every enabled entity's state now; returns how many went out
    pub fn trigger_send_all<T: Transport>(&mut self, now: f64, transport: &mut T) -> usize {
        let mut report = TickReport::default();
        for (id, entity) in self.entities.iter_mut() {
            if entity.is_enabled() {
                Self::tally(entity.send_sync(now, transport), *id, &mut report);
            }
        }
        report.sent
    }

    /// Teleport one entity
    pub fn teleport<T: Transport>(
        &mut self,
        id: EntityId,
        destination: Vec3,
        transport: &mut T,
    ) -> Result<TeleportOutcome> {
        let entity = self.entities.get_mut(&id).ok_or(Error::UnknownEntity(id))?;
        entity.teleport(destination, transport)
    }
}
