//! Error types for glide-netcode

use crate::EntityId;
use thiserror::Error;

/// Netcode error type
#[derive(Debug, Error)]
pub enum Error {
    /// Value-level error from glide-core
    #[error("core error: {0}")]
    Core(#[from] glide_core::Error),

    /// Payload could not be encoded
    #[error("encode error: {0}")]
    Encode(bincode::Error),

    /// Payload could not be decoded
    #[error("decode error: {0}")]
    Decode(bincode::Error),

    /// Configuration values are unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No entity with this id is managed
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// Transport refused a message
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for netcode operations
pub type Result<T> = std::result::Result<T, Error>;
