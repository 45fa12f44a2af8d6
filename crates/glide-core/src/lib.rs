//! Glide Core - Value types for snapshot interpolation
//!
//! This crate provides the data model shared by the rest of glide:
//! - Spatial state (`Transform`) and its partially-known wire form
//!   (`PartialTransform`)
//! - Timestamped samples (`Snapshot`) and the pure interpolation between them
//!
//! Nothing here knows about buffers, networking or roles. Those live in
//! `glide-buffer` and `glide-netcode`.
//!
//! ## Example
//!
//! ```
//! use glide_core::{Quat, Snapshot, Transform, Vec3};
//!
//! let a = Snapshot::new(0.0, 0.0, Transform::from_position(Vec3::ZERO));
//! let b = Snapshot::new(1.0, 0.0, Transform::from_position(Vec3::new(0.0, 10.0, 0.0)));
//!
//! let mid = Snapshot::interpolate(&a, &b, 0.5);
//! assert_eq!(mid.position, Vec3::new(0.0, 5.0, 0.0));
//! assert_eq!(mid.rotation, Quat::IDENTITY);
//! ```

mod error;
mod snapshot;
mod transform;

pub use error::{Error, Result};
pub use snapshot::Snapshot;
pub use transform::{PartialTransform, Transform};

// Re-export the math types so downstream crates agree on one glam version
pub use glam::{Quat, Vec3};
