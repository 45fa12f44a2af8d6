//! Glide Netcode - Snapshot interpolation for networked transforms
//!
//! This crate keeps an entity's transform in sync between a server and its
//! clients over unreliable channels:
//!
//! - **Buffering**: Incoming snapshots are ordered by sender time
//! - **Interpolation**: Playback runs a fixed delay behind, smoothing jitter
//! - **Catch-up**: Over-full buffers play back faster until drained
//! - **Scheduling**: Interval, batched, move-gated or manual sends
//! - **Authority**: Server- or client-authoritative entities, with relay
//! - **Teleport**: Instant repositioning that discards stale snapshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────── Server ───────────────┐        ┌────────── Client ──────────┐
//! │ live transform ─▶ SyncCodec ─▶ send ─┼─ S2C ─▶│ TimeBuffer ─▶ Interpolator │
//! │                                      │        │        │           │       │
//! │ Interpolator ◀─ TimeBuffer ◀─ relay ◀┼─ C2S ──┤        ▼           ▼       │
//! └──────────────────────────────────────┘        │     reset    live transform│
//!                                                 └────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use glide_netcode::{
//!     Channel, EntityId, MemoryTransport, NetworkTransform, RoleFlags, SyncConfig, SyncManager,
//!     TransformCodec,
//! };
//!
//! let config = SyncConfig::default();
//! let mut server = SyncManager::new();
//! let mut client = SyncManager::new();
//! let ball = |config, role| NetworkTransform::new(EntityId(1), config, TransformCodec, role);
//! server.spawn(ball(config.clone(), RoleFlags::server()).unwrap());
//! client.spawn(ball(config, RoleFlags::client()).unwrap());
//!
//! let mut link = MemoryTransport::new();
//! let mut now = 0.0;
//! for _ in 0..20 {
//!     now += 0.05;
//!     link.set_clock(now);
//!     if let Some(entity) = server.get_mut(EntityId(1)) {
//!         entity.transform_mut().position.x += 1.0;
//!     }
//!     server.update(now, 0.05, &mut link);
//!
//!     for envelope in link.drain(Channel::ServerToClient) {
//!         client.receive(Channel::ServerToClient, &envelope, now, &mut link);
//!     }
//!     client.update(now, 0.05, &mut link);
//! }
//!
//! let seen = client.get(EntityId(1)).unwrap().transform().position;
//! assert!(seen.x > 10.0 && seen.x <= 20.0);
//! assert_eq!(seen.y, 0.0);
//! ```

mod authority;
mod codec;
mod config;
mod error;
mod interpolation;
mod manager;
mod network_transform;
mod registry;
mod schedule;
mod transport;

pub use authority::{RoleFlags, SyncMode};
pub use codec::{SyncCodec, SyncFields, SyncRecord, TransformCodec};
pub use config::{SyncConfig, MAX_BUFFER_TIME_MULTIPLIER};
pub use error::{Error, Result};
pub use interpolation::{CatchupSettings, InterpolatedFrame, Interpolator};
pub use manager::{SyncManager, TickReport};
pub use network_transform::{
    IgnoreReason, NetworkTransform, ReceiveOutcome, SyncDiagnostics, TeleportOutcome,
};
pub use registry::{EntityId, SyncRegistry};
pub use schedule::{should_send_now, MoveGate};
pub use transport::{Channel, Envelope, MemoryTransport, SyncMessage, TeleportOrigin, Transport};

// Re-export buffer types for convenience
pub use glide_buffer::{InsertOutcome, TimeBuffer};
