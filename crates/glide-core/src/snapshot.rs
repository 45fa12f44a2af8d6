//! Timestamped transform samples
//!
//! A `Snapshot` is one sample of an entity's transform taken by the sender.
//! It carries two clocks:
//! - `remote_timestamp`: when the sender sampled it (sender's clock). All
//!   interpolation math runs on this one.
//! - `local_timestamp`: when the receiver got it (receiver's clock). Only used
//!   for staleness reporting.
//!
//! Snapshots are plain `Copy` values and never hold missing components.

use crate::Transform;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A single timestamped sample of position, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sender clock time at which this sample was taken
    pub remote_timestamp: f64,
    /// Receiver clock time at which this sample arrived
    pub local_timestamp: f64,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Snapshot {
    /// Create a snapshot from a fully resolved transform
    pub fn new(remote_timestamp: f64, local_timestamp: f64, transform: Transform) -> Self {
        Self {
            remote_timestamp,
            local_timestamp,
            position: transform.position,
            rotation: transform.rotation,
            scale: transform.scale,
        }
    }

    /// The spatial part of this snapshot
    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Interpolate between two snapshots
    ///
    /// Position and scale are interpolated linearly, rotation takes the
    /// shortest spherical path. `t` is not clamped: values outside `[0, 1]`
    /// continue the same formula. Catch-up and overshoot handling are the
    /// caller's business.
    ///
    /// `t = 0` returns `start`'s values and `t = 1` returns `goal`'s exactly.
    pub fn interpolate(start: &Snapshot, goal: &Snapshot, t: f64) -> Snapshot {
        let tf = t as f32;
        Snapshot {
            remote_timestamp: lerp_f64(start.remote_timestamp, goal.remote_timestamp, t),
            local_timestamp: lerp_f64(start.local_timestamp, goal.local_timestamp, t),
            position: lerp_vec3(start.position, goal.position, tf),
            rotation: slerp_unclamped(start.rotation, goal.rotation, tf),
            scale: lerp_vec3(start.scale, goal.scale, tf),
        }
    }
}

// Weighted form so both endpoints are hit exactly.
fn lerp_f64(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

fn lerp_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

fn slerp_unclamped(a: Quat, b: Quat, t: f32) -> Quat {
    if t == 0.0 {
        return a;
    }
    if t == 1.0 {
        return b;
    }
    // glam flips `b` when the dot product is negative
    a.slerp(b, t)
}
