//! Payload codecs
//!
//! The netcode never looks inside a sync payload. A [`SyncCodec`] turns the
//! live transform into bytes on the sending side, and bytes back into a
//! [`PartialTransform`] on the receiving side. Components a codec leaves out
//! come back as `None` and are filled from the receiver's live transform
//! before anything is buffered.
//!
//! [`TransformCodec`] is the general-purpose implementation. Games with
//! tighter bandwidth needs plug in their own (see the pong demo).

use crate::{Error, Result};
use glide_core::{PartialTransform, Quat, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// Which transform components are synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFields {
    pub position: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl SyncFields {
    /// Every component
    pub const ALL: Self = Self {
        position: true,
        rotation: true,
        scale: true,
    };

    /// Pick the synchronized components out of `transform`
    pub fn select(&self, transform: &Transform) -> PartialTransform {
        PartialTransform {
            position: self.position.then_some(transform.position),
            rotation: self.rotation.then_some(transform.rotation),
            scale: self.scale.then_some(transform.scale),
        }
    }
}

impl Default for SyncFields {
    /// Position and rotation; scale sync is rare
    fn default() -> Self {
        Self {
            position: true,
            rotation: true,
            scale: false,
        }
    }
}

/// Converts transforms to sync payloads and back
///
/// Implementations must be deterministic and must not keep per-message
/// state: the same payload may be decoded on the server and, relayed
/// unchanged, again on every observer.
pub trait SyncCodec: Send + Sync {
    /// Encode the components selected by `fields` from the live transform
    fn construct(&self, transform: &Transform, fields: SyncFields) -> Result<Vec<u8>>;

    /// Decode a payload
    ///
    /// `current` is the receiver's live transform, for codecs that only
    /// carry part of a component (e.g. a single axis).
    fn deconstruct(&self, payload: &[u8], current: &Transform) -> Result<PartialTransform>;
}

/// Wire record of the default codec
///
/// Each component is an explicit present/absent tag followed by the value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncRecord {
    pub position: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<Vec3>,
}

impl From<PartialTransform> for SyncRecord {
    fn from(p: PartialTransform) -> Self {
        Self {
            position: p.position,
            rotation: p.rotation,
            scale: p.scale,
        }
    }
}

impl From<SyncRecord> for PartialTransform {
    fn from(r: SyncRecord) -> Self {
        Self {
            position: r.position,
            rotation: r.rotation,
            scale: r.scale,
        }
    }
}

/// Default codec: optional position, rotation and scale via bincode
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformCodec;

impl SyncCodec for TransformCodec {
    fn construct(&self, transform: &Transform, fields: SyncFields) -> Result<Vec<u8>> {
        let record = SyncRecord::from(fields.select(transform));
        bincode::serialize(&record).map_err(Error::Encode)
    }

    fn deconstruct(&self, payload: &[u8], _current: &Transform) -> Result<PartialTransform> {
        let record: SyncRecord = bincode::deserialize(payload).map_err(Error::Decode)?;
        let partial = PartialTransform::from(record);

        // A NaN here would poison every interpolated frame after it
        if !partial.position.map_or(true, |p| p.is_finite()) {
            return Err(glide_core::Error::NonFinite("position").into());
        }
        if !partial.rotation.map_or(true, |r| r.is_finite()) {
            return Err(glide_core::Error::NonFinite("rotation").into());
        }
        if !partial.scale.map_or(true, |s| s.is_finite()) {
            return Err(glide_core::Error::NonFinite("scale").into());
        }
        Ok(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> Transform {
        Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.75),
            Vec3::new(2.0, 2.0, 2.0),
        )
    }

    #[test]
    fn test_round_trip_all_fields() {
        let codec = TransformCodec;
        let payload = codec.construct(&live(), SyncFields::ALL).unwrap();
        let decoded = codec.deconstruct(&payload, &Transform::IDENTITY).unwrap();

        assert_eq!(decoded, PartialTransform::from(live()));
    }

    #[test]
    fn test_omitted_fields_decode_as_none_and_resolve_to_live() {
        let codec = TransformCodec;
        let fields = SyncFields {
            position: true,
            rotation: false,
            scale: false,
        };
        let payload = codec.construct(&live(), fields).unwrap();

        let receiver_live =
            Transform::new(Vec3::ZERO, Quat::from_rotation_x(0.2), Vec3::splat(5.0));
        let decoded = codec.deconstruct(&payload, &receiver_live).unwrap();
        assert_eq!(decoded.position, Some(live().position));
        assert_eq!(decoded.rotation, None);
        assert_eq!(decoded.scale, None);

        let resolved = decoded.resolve(&receiver_live);
        assert_eq!(resolved.position, live().position);
        assert_eq!(resolved.rotation, receiver_live.rotation);
        assert_eq!(resolved.scale, receiver_live.scale);
    }

    #[test]
    fn test_omitting_saves_bytes() {
        let codec = TransformCodec;
        let full = codec.construct(&live(), SyncFields::ALL).unwrap();
        let default = codec.construct(&live(), SyncFields::default()).unwrap();
        assert!(default.len() < full.len());
    }

    #[test]
    fn test_truncated_payload_fails() {
        let codec = TransformCodec;
        let payload = codec.construct(&live(), SyncFields::ALL).unwrap();

        let result = codec.deconstruct(&payload[..payload.len() / 2], &Transform::IDENTITY);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_non_finite_payload_fails() {
        let codec = TransformCodec;
        let record = SyncRecord {
            position: Some(Vec3::new(f32::NAN, 0.0, 0.0)),
            ..SyncRecord::default()
        };
        let payload = bincode::serialize(&record).unwrap();

        let result = codec.deconstruct(&payload, &Transform::IDENTITY);
        assert!(matches!(result, Err(Error::Core(_))));
    }
}
