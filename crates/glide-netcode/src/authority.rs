//! Authority and role resolution
//!
//! Which side samples an entity and which side interpolates it depends only
//! on four flags, re-read every tick:
//!
//! | is_server | is_client | has_authority | client_authority | mode |
//! |-----------|-----------|---------------|------------------|------|
//! | yes | any | any | no | `ServerAuthoritative` |
//! | yes | any | yes | yes | `ServerAuthoritative` (host-owned) |
//! | yes | any | no | yes | `ClientAuthoritativeRelay` |
//! | no | yes | yes | yes | `AuthoritativeClient` |
//! | no | yes | otherwise | | `ObservingClient` |
//! | no | no | | | `Inactive` |
//!
//! A host (server and client at once) always resolves through the server
//! rows. Its client half never consumes the server's own broadcasts.
//!
//! Nothing is stored besides the flags. Switching modes never clears a
//! buffer; only a reset does.

use crate::transport::Channel;
use serde::{Deserialize, Serialize};

/// Which end of the connection this process is, for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleFlags {
    pub is_server: bool,
    pub is_client: bool,
    /// This process owns the entity
    pub has_authority: bool,
}

impl RoleFlags {
    /// Dedicated server
    pub fn server() -> Self {
        Self {
            is_server: true,
            is_client: false,
            has_authority: false,
        }
    }

    /// Server and client in one process
    pub fn host() -> Self {
        Self {
            is_server: true,
            is_client: true,
            has_authority: false,
        }
    }

    /// Remote client
    pub fn client() -> Self {
        Self {
            is_server: false,
            is_client: true,
            has_authority: false,
        }
    }

    /// Same role with ownership of the entity
    pub fn with_authority(self, has_authority: bool) -> Self {
        Self {
            has_authority,
            ..self
        }
    }

    /// Owning client of a client-authoritative entity
    pub fn is_client_with_authority(&self, client_authority: bool) -> bool {
        self.has_authority && client_authority
    }

    /// Resolve this tick's mode
    pub fn mode(&self, client_authority: bool) -> SyncMode {
        if self.is_server {
            if !client_authority || self.has_authority {
                SyncMode::ServerAuthoritative
            } else {
                SyncMode::ClientAuthoritativeRelay
            }
        } else if self.is_client {
            if self.is_client_with_authority(client_authority) {
                SyncMode::AuthoritativeClient
            } else {
                SyncMode::ObservingClient
            }
        } else {
            SyncMode::Inactive
        }
    }
}

/// What this process does with an entity on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Server samples the live transform and broadcasts it
    ServerAuthoritative,
    /// Server interpolates what the owning client sends and relays it
    ClientAuthoritativeRelay,
    /// Owning client samples and sends to the server
    AuthoritativeClient,
    /// Client interpolates what the server broadcasts
    ObservingClient,
    /// Not networked
    Inactive,
}

impl SyncMode {
    /// Channel this mode sends on, if it sends
    pub fn send_channel(&self) -> Option<Channel> {
        match self {
            SyncMode::ServerAuthoritative => Some(Channel::ServerToClient),
            SyncMode::AuthoritativeClient => Some(Channel::ClientToServer),
            _ => None,
        }
    }

    /// Inbound channel whose snapshots this mode buffers and interpolates
    pub fn receive_channel(&self) -> Option<Channel> {
        match self {
            SyncMode::ClientAuthoritativeRelay => Some(Channel::ClientToServer),
            SyncMode::ObservingClient => Some(Channel::ServerToClient),
            _ => None,
        }
    }

    /// Check if this mode samples and sends
    pub fn sends(&self) -> bool {
        self.send_channel().is_some()
    }

    /// Check if this mode buffers and interpolates
    pub fn interpolates(&self) -> bool {
        self.receive_channel().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_authoritative() {
        let role = RoleFlags::server();
        assert_eq!(role.mode(false), SyncMode::ServerAuthoritative);
        assert_eq!(
            SyncMode::ServerAuthoritative.send_channel(),
            Some(Channel::ServerToClient)
        );
        assert!(!SyncMode::ServerAuthoritative.interpolates());
    }

    #[test]
    fn test_client_authority_on_server_relays() {
        let role = RoleFlags::server();
        assert_eq!(role.mode(true), SyncMode::ClientAuthoritativeRelay);
        assert!(!SyncMode::ClientAuthoritativeRelay.sends());
        assert_eq!(
            SyncMode::ClientAuthoritativeRelay.receive_channel(),
            Some(Channel::ClientToServer)
        );
    }

    #[test]
    fn test_host_owned_client_authority_sends() {
        let role = RoleFlags::host().with_authority(true);
        assert_eq!(role.mode(true), SyncMode::ServerAuthoritative);
    }

    #[test]
    fn test_host_never_observes() {
        for authority in [false, true] {
            for client_authority in [false, true] {
                let mode = RoleFlags::host().with_authority(authority).mode(client_authority);
                assert_ne!(mode, SyncMode::ObservingClient);
                assert_ne!(mode, SyncMode::AuthoritativeClient);
            }
        }
    }

    #[test]
    fn test_client_modes() {
        let client = RoleFlags::client();
        assert_eq!(client.mode(false), SyncMode::ObservingClient);
        assert_eq!(client.mode(true), SyncMode::ObservingClient);

        let owner = client.with_authority(true);
        assert_eq!(owner.mode(true), SyncMode::AuthoritativeClient);
        // Server-authoritative entity: ownership alone does not make it send
        assert_eq!(owner.mode(false), SyncMode::ObservingClient);
    }

    #[test]
    fn test_inactive() {
        assert_eq!(RoleFlags::default().mode(false), SyncMode::Inactive);
        assert!(!SyncMode::Inactive.sends());
        assert!(!SyncMode::Inactive.interpolates());
    }
}
