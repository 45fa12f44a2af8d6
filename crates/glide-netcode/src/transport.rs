//! Transport boundary
//!
//! glide needs two unreliable logical channels, client->server and
//! server->client. Users implement [`Transport`] for their network stack;
//! the stack is responsible for stamping each message with the sender's
//! clock and handing that stamp to the receiver alongside the message, as an
//! [`Envelope`].
//!
//! [`MemoryTransport`] is an in-process implementation for tests and demos.

use crate::registry::EntityId;
use crate::{Error, Result};
use glide_core::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::convert::Infallible;

/// Logical channel, both unreliable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    ClientToServer,
    ServerToClient,
}

/// Who asked for a teleport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeleportOrigin {
    /// The server moved the entity
    Server,
    /// The owning client moved a client-authoritative entity
    Owner,
}

/// Messages exchanged for synchronized entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Codec payload with the sender's transform
    Sync { entity: EntityId, payload: Vec<u8> },
    /// Hard reset to a position, bypassing interpolation
    Teleport {
        entity: EntityId,
        destination: Vec3,
        origin: TeleportOrigin,
    },
}

impl SyncMessage {
    /// Entity this message is about
    pub fn entity(&self) -> EntityId {
        match self {
            SyncMessage::Sync { entity, .. } | SyncMessage::Teleport { entity, .. } => *entity,
        }
    }
}

/// A received message with the sender's timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender clock time when the message was sent
    pub remote_timestamp: f64,
    pub message: SyncMessage,
}

impl Envelope {
    /// Serialize for a byte-level link
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::Encode)
    }

    /// Deserialize from a byte-level link
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(Error::Decode)
    }
}

/// Outbound side of the network
///
/// Sends are fire-and-forget: no delivery, ordering or deduplication is
/// expected.
pub trait Transport {
    /// Error type for this transport
    type Error: std::error::Error + Send + Sync + 'static;

    /// Queue a message on a channel
    fn send(
        &mut self,
        channel: Channel,
        message: SyncMessage,
    ) -> std::result::Result<(), Self::Error>;
}

/// In-process transport with optional deterministic packet loss
///
/// Messages are stamped with the clock set through [`set_clock`] and queued
/// per channel until drained.
///
/// [`set_clock`]: MemoryTransport::set_clock
#[derive(Debug, Default)]
pub struct MemoryTransport {
    clock: f64,
    client_to_server: VecDeque<Envelope>,
    server_to_client: VecDeque<Envelope>,
    /// Drop every Nth message
    drop_every: Option<usize>,
    sent: usize,
    dropped: usize,
}

impl MemoryTransport {
    /// Create a lossless transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every `n`th message sent; 0 disables loss
    pub fn with_drop_every(mut self, n: usize) -> Self {
        self.drop_every = (n > 0).then_some(n);
        self
    }

    /// Set the sender clock used to stamp outgoing messages
    pub fn set_clock(&mut self, now: f64) {
        self.clock = now;
    }

    /// Take every queued message for `channel`, oldest first
    pub fn drain(&mut self, channel: Channel) -> Vec<Envelope> {
        self.queue_mut(channel).drain(..).collect()
    }

    /// Number of queued messages for `channel`
    pub fn pending(&self, channel: Channel) -> usize {
        match channel {
            Channel::ClientToServer => self.client_to_server.len(),
            Channel::ServerToClient => self.server_to_client.len(),
        }
    }

    /// Messages accepted by `send`, including dropped ones
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Messages discarded by simulated loss
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn queue_mut(&mut self, channel: Channel) -> &mut VecDeque<Envelope> {
        match channel {
            Channel::ClientToServer => &mut self.client_to_server,
            Channel::ServerToClient => &mut self.server_to_client,
        }
    }
}

impl Transport for MemoryTransport {
    type Error = Infallible;

    fn send(
        &mut self,
        channel: Channel,
        message: SyncMessage,
    ) -> std::result::Result<(), Infallible> {
        self.sent += 1;
        if self.drop_every.is_some_and(|n| self.sent % n == 0) {
            self.dropped += 1;
            return Ok(());
        }

        let envelope = Envelope {
            remote_timestamp: self.clock,
            message,
        };
        self.queue_mut(channel).push_back(envelope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync(id: u64) -> SyncMessage {
        SyncMessage::Sync {
            entity: EntityId(id),
            payload: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_stamps_with_clock() {
        let mut transport = MemoryTransport::new();
        transport.set_clock(1.5);
        transport.send(Channel::ServerToClient, sync(1)).unwrap();

        let received = transport.drain(Channel::ServerToClient);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].remote_timestamp, 1.5);
        assert_eq!(received[0].message.entity(), EntityId(1));
        assert_eq!(transport.pending(Channel::ServerToClient), 0);
    }

    #[test]
    fn test_channels_are_separate() {
        let mut transport = MemoryTransport::new();
        transport.send(Channel::ClientToServer, sync(1)).unwrap();
        transport.send(Channel::ServerToClient, sync(2)).unwrap();

        assert_eq!(transport.pending(Channel::ClientToServer), 1);
        assert_eq!(transport.pending(Channel::ServerToClient), 1);
    }

    #[test]
    fn test_drop_every() {
        let mut transport = MemoryTransport::new().with_drop_every(3);
        for i in 0..9 {
            transport.send(Channel::ServerToClient, sync(i)).unwrap();
        }

        assert_eq!(transport.sent(), 9);
        assert_eq!(transport.dropped(), 3);
        assert_eq!(transport.pending(Channel::ServerToClient), 6);
    }

    #[test]
    fn test_envelope_bytes() {
        let envelope = Envelope {
            remote_timestamp: 3.25,
            message: SyncMessage::Teleport {
                entity: EntityId(9),
                destination: Vec3::new(1.0, 2.0, 3.0),
                origin: TeleportOrigin::Owner,
            },
        };

        let bytes = envelope.encode().unwrap();
        assert_eq!(Envelope::decode(&bytes).unwrap(), envelope);
        assert!(Envelope::decode(&bytes[..4]).is_err());
    }
}
