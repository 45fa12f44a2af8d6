//! Bandwidth-trimmed codecs for the two kinds of pong objects

use glide_core::{PartialTransform, Transform, Vec3};
use glide_netcode::{Error, Result, SyncCodec, SyncFields};

/// Fixed-point scale for racket heights
const RACKET_UNITS_PER_METER: f32 = 1000.0;

/// Ball: full position as three floats, nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct BallCodec;

impl SyncCodec for BallCodec {
    fn construct(&self, transform: &Transform, _fields: SyncFields) -> Result<Vec<u8>> {
        bincode::serialize(&transform.position.to_array()).map_err(Error::Encode)
    }

    fn deconstruct(&self, payload: &[u8], _current: &Transform) -> Result<PartialTransform> {
        let raw: [f32; 3] = bincode::deserialize(payload).map_err(Error::Decode)?;
        let position = Vec3::from_array(raw);
        if !position.is_finite() {
            return Err(glide_core::Error::NonFinite("position").into());
        }
        Ok(PartialTransform::with_position(position))
    }
}

/// Racket: only the height, as millimeters in an `i16`
///
/// Rackets slide along a fixed rail, so x and z come from the receiver's
/// own copy. Heights outside +-32.767 cannot be represented and fail to
/// encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct RacketCodec;

impl RacketCodec {
    fn to_fixed(y: f32) -> Result<i16> {
        let scaled = (y * RACKET_UNITS_PER_METER).round();
        if !scaled.is_finite() || scaled < f32::from(i16::MIN) || scaled > f32::from(i16::MAX) {
            return Err(glide_core::Error::OutOfRange {
                field: "racket height",
                value: f64::from(y),
                min: f64::from(i16::MIN) / 1000.0,
                max: f64::from(i16::MAX) / 1000.0,
            }
            .into());
        }
        Ok(scaled as i16)
    }
}

impl SyncCodec for RacketCodec {
    fn construct(&self, transform: &Transform, _fields: SyncFields) -> Result<Vec<u8>> {
        let fixed = Self::to_fixed(transform.position.y)?;
        bincode::serialize(&fixed).map_err(Error::Encode)
    }

    fn deconstruct(&self, payload: &[u8], current: &Transform) -> Result<PartialTransform> {
        let fixed: i16 = bincode::deserialize(payload).map_err(Error::Decode)?;
        let y = f32::from(fixed) / RACKET_UNITS_PER_METER;
        Ok(PartialTransform::with_position(Vec3::new(
            current.position.x,
            y,
            current.position.z,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_carries_position_only() {
        let live = Transform::from_position(Vec3::new(1.5, -2.0, 0.0));
        let payload = BallCodec.construct(&live, SyncFields::ALL).unwrap();
        assert_eq!(payload.len(), 12);

        let decoded = BallCodec.deconstruct(&payload, &Transform::IDENTITY).unwrap();
        assert_eq!(decoded.position, Some(live.position));
        assert_eq!(decoded.rotation, None);
        assert_eq!(decoded.scale, None);
    }

    #[test]
    fn test_ball_rejects_short_payload() {
        assert!(matches!(
            BallCodec.deconstruct(&[0, 0, 0], &Transform::IDENTITY),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_racket_is_two_bytes_and_keeps_rail() {
        let live = Transform::from_position(Vec3::new(8.0, 1.234, 0.0));
        let payload = RacketCodec.construct(&live, SyncFields::default()).unwrap();
        assert_eq!(payload.len(), 2);

        let receiver = Transform::from_position(Vec3::new(-8.0, 0.0, 3.0));
        let decoded = RacketCodec.deconstruct(&payload, &receiver).unwrap();
        let position = decoded.position.unwrap();
        assert_eq!(position.x, -8.0);
        assert_eq!(position.z, 3.0);
        assert!((position.y - 1.234).abs() < 1e-3);
    }

    #[test]
    fn test_racket_out_of_range_is_an_error() {
        let live = Transform::from_position(Vec3::new(0.0, 40.0, 0.0));
        let result = RacketCodec.construct(&live, SyncFields::default());
        assert!(matches!(
            result,
            Err(Error::Core(glide_core::Error::OutOfRange { .. }))
        ));

        let live = Transform::from_position(Vec3::new(0.0, f32::NAN, 0.0));
        assert!(RacketCodec.construct(&live, SyncFields::default()).is_err());
    }
}
