//! Per-entity synchronization
//!
//! A [`NetworkTransform`] owns one entity's live transform, its two inbound
//! snapshot buffers (one per direction) with their interpolation cursors,
//! and its send bookkeeping. Each tick it:
//!
//! 1. resolves its [`SyncMode`] from the current role flags
//! 2. samples and sends, if the mode sends and a send is due
//! 3. advances interpolation on the buffer the mode consumes and applies the
//!    resulting frame to the live transform
//!
//! Inbound messages are decoded and buffered as they arrive. Nothing here
//! panics or returns an error for bad network input: a message is either
//! buffered or dropped, and the outcome says which and why.

use crate::authority::{RoleFlags, SyncMode};
use crate::codec::SyncCodec;
use crate::config::SyncConfig;
use crate::interpolation::{InterpolatedFrame, Interpolator};
use crate::registry::EntityId;
use crate::schedule::{should_send_now, MoveGate};
use crate::transport::{Channel, Envelope, SyncMessage, TeleportOrigin, Transport};
use crate::{Error, Result};
use glide_buffer::{InsertOutcome, TimeBuffer};
use glide_core::{Snapshot, Transform, Vec3};
use tracing::{debug, trace, warn};

/// Why an inbound message was not used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The entity is disabled
    Disabled,
    /// No entity with the message's id
    UnknownEntity,
    /// Client->server message on a process that is not a server
    NotServer,
    /// Client->server sync for an entity the server is authoritative over
    NotClientAuthoritative,
    /// A host's own server broadcast arriving at its client half
    HostSelfReceipt,
    /// State for an entity this process owns and drives itself
    OwnedLocally,
}

/// What happened to an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Decoded and stored in a buffer
    Buffered,
    /// Decoded but refused by the buffer
    Rejected(InsertOutcome),
    /// Payload failed to decode; nothing was touched
    Malformed,
    /// Teleport applied
    Teleported,
    /// Not applicable to this process
    Ignored(IgnoreReason),
}

/// Result of asking for a teleport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportOutcome {
    /// Applied locally and sent to the other side
    Applied,
    /// This process may not move the entity
    NotPermitted,
}

/// Buffer occupancy and catch-up, for debug overlays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncDiagnostics {
    pub server_buffer: usize,
    pub client_buffer: usize,
    /// Extra playback speed on the server buffer, in percent
    pub server_catchup_percent: f64,
    /// Extra playback speed on the client buffer, in percent
    pub client_catchup_percent: f64,
}

/// One direction's snapshot buffer and its cursor
#[derive(Debug, Clone)]
struct Inbound {
    buffer: TimeBuffer,
    interpolator: Interpolator,
}

impl Inbound {
    fn new(config: &SyncConfig) -> Self {
        Self {
            buffer: TimeBuffer::new(config.buffer_size_limit),
            interpolator: Interpolator::new(config.catchup()),
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.interpolator.reset();
    }

    fn catchup_percent(&self) -> f64 {
        self.interpolator.catchup().catchup(self.buffer.len()) * 100.0
    }
}

/// A synchronized entity
pub struct NetworkTransform {
    id: EntityId,
    config: SyncConfig,
    role: RoleFlags,
    codec: Box<dyn SyncCodec>,
    /// Live local transform; the host reads and writes it
    transform: Transform,
    enabled: bool,
    /// Snapshots from the owning client, consumed on the server
    server: Inbound,
    /// Snapshots from the server, consumed on clients
    client: Inbound,
    last_server_send: f64,
    last_client_send: f64,
    move_gate: MoveGate,
}

impl NetworkTransform {
    /// Create an enabled entity at the identity transform
    ///
    /// The configuration is validated (and possibly adjusted) first.
    pub fn new(
        id: EntityId,
        mut config: SyncConfig,
        codec: impl SyncCodec + 'static,
        role: RoleFlags,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id,
            server: Inbound::new(&config),
            client: Inbound::new(&config),
            config,
            role,
            codec: Box::new(codec),
            transform: Transform::IDENTITY,
            enabled: true,
            last_server_send: f64::NEG_INFINITY,
            last_client_send: f64::NEG_INFINITY,
            move_gate: MoveGate::new(),
        })
    }

    /// Start from `transform` instead of identity
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn role(&self) -> RoleFlags {
        self.role
    }

    /// Change role flags; takes effect on the next tick
    pub fn set_role(&mut self, role: RoleFlags) {
        self.role = role;
    }

    /// Grant or revoke ownership
    pub fn set_authority(&mut self, has_authority: bool) {
        self.role.has_authority = has_authority;
    }

    /// Mode for the current role flags
    pub fn mode(&self) -> SyncMode {
        self.role.mode(self.config.client_authority)
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Live transform, for the host to move authoritative entities
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Snapshots waiting on the server side
    pub fn server_buffer(&self) -> &TimeBuffer {
        &self.server.buffer
    }

    /// Snapshots waiting on the client side
    pub fn client_buffer(&self) -> &TimeBuffer {
        &self.client.buffer
    }

    pub fn server_cursor(&self) -> f64 {
        self.server.interpolator.cursor()
    }

    pub fn client_cursor(&self) -> f64 {
        self.client.interpolator.cursor()
    }

    /// Enable, starting from empty buffers
    ///
    /// Batch membership is updated by [`SyncManager::set_enabled`].
    ///
    /// [`SyncManager::set_enabled`]: crate::SyncManager::set_enabled
    pub(crate) fn enable(&mut self) {
        self.reset();
        self.enabled = true;
    }

    /// Disable and drop all buffered state
    pub(crate) fn disable(&mut self) {
        self.reset();
        self.enabled = false;
    }

    /// Clear both buffers and both cursors
    pub fn reset(&mut self) {
        if !self.server.buffer.is_empty() || !self.client.buffer.is_empty() {
            debug!(
                entity = %self.id,
                server = self.server.buffer.len(),
                client = self.client.buffer.len(),
                "clearing snapshot buffers"
            );
        }
        self.server.reset();
        self.client.reset();
    }

    /// Buffer occupancy and catch-up figures
    pub fn diagnostics(&self) -> SyncDiagnostics {
        SyncDiagnostics {
            server_buffer: self.server.buffer.len(),
            client_buffer: self.client.buffer.len(),
            server_catchup_percent: self.server.catchup_percent(),
            client_catchup_percent: self.client.catchup_percent(),
        }
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Whether this entity's own send interval has elapsed
    pub fn is_send_due(&self, now: f64) -> bool {
        match self.mode().send_channel() {
            Some(channel) => {
                should_send_now(now, self.last_send(channel), self.config.send_interval)
            }
            None => false,
        }
    }

    fn last_send(&self, channel: Channel) -> f64 {
        match channel {
            Channel::ServerToClient => self.last_server_send,
            Channel::ClientToServer => self.last_client_send,
        }
    }

    /// Sample the live transform and send it now, ignoring the interval
    ///
    /// Returns `Ok(false)` when nothing was sent, including whenever the
    /// entity is disabled.
    pub fn send_sync<T: Transport>(&mut self, now: f64, transport: &mut T) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }
        let Some(channel) = self.mode().send_channel() else {
            return Ok(false);
        };

        let position = self.transform.position;
        if self.config.only_send_on_move && self.move_gate.should_skip(position) {
            return Ok(false);
        }

        let payload = self
            .codec
            .construct(&self.transform, self.config.sync_fields())?;
        transport
            .send(
                channel,
                SyncMessage::Sync {
                    entity: self.id,
                    payload,
                },
            )
            .map_err(|e| Error::Transport(Box::new(e)))?;

        match channel {
            Channel::ServerToClient => self.last_server_send = now,
            Channel::ClientToServer => self.last_client_send = now,
        }
        self.move_gate.record_send(position);
        trace!(entity = %self.id, ?channel, now, "sync sent");
        Ok(true)
    }

    /// Send if this entity schedules itself and its interval has elapsed
    ///
    /// Batched and manually triggered entities never send from here.
    pub fn send_if_due<T: Transport>(&mut self, now: f64, transport: &mut T) -> Result<bool> {
        if !self.enabled || self.config.manual_trigger_send || self.config.sync_send_interval {
            return Ok(false);
        }
        if !self.is_send_due(now) {
            return Ok(false);
        }
        self.send_sync(now, transport)
    }

    // ------------------------------------------------------------------
    // Interpolation
    // ------------------------------------------------------------------

    /// Advance interpolation for the buffer the current mode consumes and
    /// apply the frame
    pub fn render(&mut self, now: f64, delta: f64) -> Option<InterpolatedFrame> {
        if !self.enabled {
            return None;
        }
        let inbound = match self.mode().receive_channel()? {
            Channel::ClientToServer => &mut self.server,
            Channel::ServerToClient => &mut self.client,
        };
        let frame = inbound.interpolator.advance(&mut inbound.buffer, now, delta)?;
        self.apply_frame(&frame);
        Some(frame)
    }

    /// Write a frame into the live transform
    ///
    /// Components that are not synced are left alone. Synced components
    /// take the interpolated value, or the goal's when their interpolation
    /// flag is off.
    fn apply_frame(&mut self, frame: &InterpolatedFrame) {
        let config = &self.config;
        let pick = |interpolate: bool| {
            if interpolate {
                &frame.interpolated
            } else {
                &frame.goal
            }
        };

        if config.sync_position {
            self.transform.position = pick(config.interpolate_position).position;
        }
        if config.sync_rotation {
            self.transform.rotation = pick(config.interpolate_rotation).rotation;
        }
        if config.sync_scale {
            self.transform.scale = pick(config.interpolate_scale).scale;
        }
    }

    // ------------------------------------------------------------------
    // Receiving
    // ------------------------------------------------------------------

    /// Handle an inbound message for this entity
    ///
    /// On a server, accepted client syncs and owner teleports are relayed to
    /// the other clients through `transport`.
    pub fn receive<T: Transport>(
        &mut self,
        channel: Channel,
        envelope: &Envelope,
        now: f64,
        transport: &mut T,
    ) -> ReceiveOutcome {
        if !self.enabled {
            return ReceiveOutcome::Ignored(IgnoreReason::Disabled);
        }

        let outcome = match (&envelope.message, channel) {
            (SyncMessage::Sync { payload, .. }, Channel::ClientToServer) => {
                self.on_client_to_server_sync(payload, envelope.remote_timestamp, now)
            }
            (SyncMessage::Sync { payload, .. }, Channel::ServerToClient) => {
                self.on_server_to_client_sync(payload, envelope.remote_timestamp, now)
            }
            (SyncMessage::Teleport { destination, .. }, Channel::ClientToServer) => {
                self.on_client_to_server_teleport(*destination)
            }
            (SyncMessage::Teleport { destination, origin, .. }, Channel::ServerToClient) => {
                self.on_server_to_client_teleport(*destination, *origin)
            }
        };

        let relay = channel == Channel::ClientToServer
            && matches!(
                outcome,
                ReceiveOutcome::Buffered | ReceiveOutcome::Rejected(_) | ReceiveOutcome::Teleported
            );
        if relay {
            if let Err(e) = transport.send(Channel::ServerToClient, envelope.message.clone()) {
                warn!(entity = %self.id, error = %e, "relay to clients failed");
            }
        }

        outcome
    }

    fn on_client_to_server_sync(
        &mut self,
        payload: &[u8],
        remote: f64,
        now: f64,
    ) -> ReceiveOutcome {
        if !self.role.is_server {
            return ReceiveOutcome::Ignored(IgnoreReason::NotServer);
        }
        match self.mode() {
            SyncMode::ClientAuthoritativeRelay => {
                self.buffer_incoming(Channel::ClientToServer, payload, remote, now)
            }
            _ if !self.config.client_authority => {
                ReceiveOutcome::Ignored(IgnoreReason::NotClientAuthoritative)
            }
            _ => ReceiveOutcome::Ignored(IgnoreReason::OwnedLocally),
        }
    }

    fn on_server_to_client_sync(
        &mut self,
        payload: &[u8],
        remote: f64,
        now: f64,
    ) -> ReceiveOutcome {
        // A host's client half would fill a buffer nothing ever drains
        if self.role.is_server {
            return ReceiveOutcome::Ignored(IgnoreReason::HostSelfReceipt);
        }
        if self.role.is_client_with_authority(self.config.client_authority) {
            return ReceiveOutcome::Ignored(IgnoreReason::OwnedLocally);
        }
        self.buffer_incoming(Channel::ServerToClient, payload, remote, now)
    }

    /// Decode, fill missing components from the live transform and insert
    fn buffer_incoming(
        &mut self,
        channel: Channel,
        payload: &[u8],
        remote: f64,
        now: f64,
    ) -> ReceiveOutcome {
        let partial = match self.codec.deconstruct(payload, &self.transform) {
            Ok(partial) => partial,
            Err(e) => {
                warn!(entity = %self.id, ?channel, error = %e, "dropping malformed sync payload");
                return ReceiveOutcome::Malformed;
            }
        };

        if self.inbound(channel).buffer.is_full() {
            return ReceiveOutcome::Rejected(InsertOutcome::Full);
        }

        // After a long stationary pause, start over instead of replaying the
        // pause as one very slow move
        if self.config.only_send_on_move {
            let gap = self.config.reset_gap();
            let buffer = &self.inbound(channel).buffer;
            let idle = buffer.len() == 2
                && buffer
                    .second()
                    .is_some_and(|second| second.remote_timestamp + gap < remote);
            if idle {
                debug!(entity = %self.id, ?channel, "receive gap exceeded, resetting");
                self.reset();
            }
        }

        let snapshot = Snapshot::new(remote, now, partial.resolve(&self.transform));
        let inbound = match channel {
            Channel::ClientToServer => &mut self.server,
            Channel::ServerToClient => &mut self.client,
        };
        match inbound.buffer.insert(snapshot) {
            outcome if outcome.is_accepted() => ReceiveOutcome::Buffered,
            outcome => ReceiveOutcome::Rejected(outcome),
        }
    }

    fn inbound(&self, channel: Channel) -> &Inbound {
        match channel {
            Channel::ClientToServer => &self.server,
            Channel::ServerToClient => &self.client,
        }
    }

    // ------------------------------------------------------------------
    // Teleport
    // ------------------------------------------------------------------

    /// Jump to `destination` without interpolating
    ///
    /// Allowed on the server for any entity, and on the owning client of a
    /// client-authoritative entity. The jump is applied locally right away
    /// and sent to the other side so observers drop their stale snapshots
    /// too.
    pub fn teleport<T: Transport>(
        &mut self,
        destination: Vec3,
        transport: &mut T,
    ) -> Result<TeleportOutcome> {
        let (channel, origin) = if self.role.is_server {
            (Channel::ServerToClient, TeleportOrigin::Server)
        } else if self.mode() == SyncMode::AuthoritativeClient {
            (Channel::ClientToServer, TeleportOrigin::Owner)
        } else {
            return Ok(TeleportOutcome::NotPermitted);
        };

        self.apply_teleport(destination);
        transport
            .send(
                channel,
                SyncMessage::Teleport {
                    entity: self.id,
                    destination,
                    origin,
                },
            )
            .map_err(|e| Error::Transport(Box::new(e)))?;
        Ok(TeleportOutcome::Applied)
    }

    fn on_client_to_server_teleport(&mut self, destination: Vec3) -> ReceiveOutcome {
        if !self.role.is_server {
            return ReceiveOutcome::Ignored(IgnoreReason::NotServer);
        }
        // Clients may only move what they have authority over
        if self.mode() != SyncMode::ClientAuthoritativeRelay {
            return ReceiveOutcome::Ignored(IgnoreReason::NotClientAuthoritative);
        }
        self.apply_teleport(destination);
        ReceiveOutcome::Teleported
    }

    fn on_server_to_client_teleport(
        &mut self,
        destination: Vec3,
        origin: TeleportOrigin,
    ) -> ReceiveOutcome {
        if self.role.is_server {
            return ReceiveOutcome::Ignored(IgnoreReason::HostSelfReceipt);
        }
        // The owner already jumped when it asked; applying the echo would
        // undo any movement made since
        if origin == TeleportOrigin::Owner
            && self.role.is_client_with_authority(self.config.client_authority)
        {
            return ReceiveOutcome::Ignored(IgnoreReason::OwnedLocally);
        }
        self.apply_teleport(destination);
        ReceiveOutcome::Teleported
    }

    fn apply_teleport(&mut self, destination: Vec3) {
        debug!(entity = %self.id, ?destination, "teleport");
        self.reset();
        self.transform.position = destination;
    }
}

impl std::fmt::Debug for NetworkTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkTransform")
            .field("id", &self.id)
            .field("mode", &self.mode())
            .field("enabled", &self.enabled)
            .field("server_buffer", &self.server.buffer.len())
            .field("client_buffer", &self.client.buffer.len())
            .finish()
    }
}
