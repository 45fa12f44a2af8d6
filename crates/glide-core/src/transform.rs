//! Spatial state of a synchronized entity
//!
//! `Transform` is always fully specified. `PartialTransform` is what a codec
//! hands back after decoding a payload: any field may be absent, meaning
//! "unchanged, keep what the receiver already has".

use crate::{Error, Result};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Local position, rotation and scale of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform: origin, no rotation, unit scale
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform from all three components
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Identity transform moved to `position`
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Check that every component is finite
    pub fn validate(&self) -> Result<()> {
        if !self.position.is_finite() {
            return Err(Error::NonFinite("position"));
        }
        if !self.rotation.is_finite() {
            return Err(Error::NonFinite("rotation"));
        }
        if !self.scale.is_finite() {
            return Err(Error::NonFinite("scale"));
        }
        Ok(())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A transform where each component may be missing
///
/// Produced by decoding a sync payload. Must be resolved against a fallback
/// before it can become a [`Snapshot`](crate::Snapshot).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PartialTransform {
    pub position: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<Vec3>,
}

impl PartialTransform {
    /// A partial transform with nothing set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Only the position is known
    pub fn with_position(position: Vec3) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Fill every missing component from `fallback`
    pub fn resolve(self, fallback: &Transform) -> Transform {
        Transform {
            position: self.position.unwrap_or(fallback.position),
            rotation: self.rotation.unwrap_or(fallback.rotation),
            scale: self.scale.unwrap_or(fallback.scale),
        }
    }

    /// True if no component is present
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.rotation.is_none() && self.scale.is_none()
    }
}

impl From<Transform> for PartialTransform {
    fn from(t: Transform) -> Self {
        Self {
            position: Some(t.position),
            rotation: Some(t.rotation),
            scale: Some(t.scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_fills_missing_fields() {
        let live = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.5),
            Vec3::splat(2.0),
        );

        let partial = PartialTransform::with_position(Vec3::new(9.0, 9.0, 9.0));
        let resolved = partial.resolve(&live);

        assert_eq!(resolved.position, Vec3::new(9.0, 9.0, 9.0));
        assert_eq!(resolved.rotation, live.rotation);
        assert_eq!(resolved.scale, live.scale);
    }

    #[test]
    fn test_empty_resolves_to_fallback() {
        let live = Transform::from_position(Vec3::X);
        let partial = PartialTransform::empty();
        assert!(partial.is_empty());
        assert_eq!(partial.resolve(&live), live);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut t = Transform::IDENTITY;
        assert!(t.validate().is_ok());

        t.position.y = f32::NAN;
        assert_eq!(t.validate(), Err(Error::NonFinite("position")));
    }
}
