//! Snapshot interpolation with catch-up
//!
//! The interpolator walks a virtual playback time (the cursor) through the
//! interval formed by the two oldest buffered snapshots. Each tick it:
//!
//! 1. advances the cursor by `delta`, sped up when the buffer is over-full
//! 2. consumes the oldest snapshot whenever the cursor passes the interval,
//!    carrying the remainder into the next interval
//! 3. holds at the goal when there is nothing left to move on to
//! 4. interpolates start -> goal at `cursor / interval`
//!
//! Fewer than two buffered snapshots is the normal warm-up or underrun state
//! and produces no frame.

use glide_buffer::TimeBuffer;
use glide_core::Snapshot;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Playback acceleration for an over-full buffer
///
/// Once the buffer holds more than `threshold` snapshots, every excess
/// entry speeds playback up by `multiplier` (0.1 = 10%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatchupSettings {
    pub threshold: usize,
    pub multiplier: f64,
}

impl CatchupSettings {
    /// Create catch-up settings
    pub fn new(threshold: usize, multiplier: f64) -> Self {
        Self {
            threshold,
            multiplier,
        }
    }

    /// Extra speed as a fraction (0.6 = 60% faster) for a buffer of `len`
    pub fn catchup(&self, len: usize) -> f64 {
        len.saturating_sub(self.threshold) as f64 * self.multiplier
    }

    /// Playback speed factor for a buffer of `len`, never below 1
    pub fn speed_factor(&self, len: usize) -> f64 {
        1.0 + self.catchup(len).max(0.0)
    }
}

impl Default for CatchupSettings {
    fn default() -> Self {
        Self::new(4, 0.10)
    }
}

/// One tick's interpolation result
///
/// `start` and `goal` are the raw buffered snapshots, for hosts that want to
/// apply some components discretely instead of interpolated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedFrame {
    pub start: Snapshot,
    pub goal: Snapshot,
    pub interpolated: Snapshot,
    /// Interpolation fraction used, `cursor / interval`
    pub t: f64,
    /// Receiver-clock age of `start` at the time of the tick
    pub staleness: f64,
}

/// Cursor over one time buffer
#[derive(Debug, Clone)]
pub struct Interpolator {
    /// Virtual time within the current interval
    ///
    /// Between 0 and the interval length, clamped to the length while
    /// waiting for more data.
    cursor: f64,
    catchup: CatchupSettings,
}

impl Interpolator {
    /// Create an interpolator at cursor 0
    pub fn new(catchup: CatchupSettings) -> Self {
        Self {
            cursor: 0.0,
            catchup,
        }
    }

    /// Step playback by `delta` seconds and interpolate
    ///
    /// Consumes fully played snapshots from `buffer`. Returns `None` while
    /// the buffer has fewer than two entries.
    pub fn advance(
        &mut self,
        buffer: &mut TimeBuffer,
        now: f64,
        delta: f64,
    ) -> Option<InterpolatedFrame> {
        if buffer.len() < 2 {
            return None;
        }

        let speed = self.catchup.speed_factor(buffer.len());
        let step = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.cursor += step * speed;

        let mut interval = Self::interval_of(buffer)?;
        while self.cursor >= interval {
            if buffer.len() > 2 {
                buffer.pop_first();
                self.cursor -= interval;
                interval = Self::interval_of(buffer)?;
            } else {
                // Underrun: hold at the goal until more data arrives
                self.cursor = interval;
                break;
            }
        }

        let (start, goal) = buffer.interval().map(|(s, g)| (*s, *g))?;
        let t = if interval > 0.0 {
            self.cursor / interval
        } else {
            1.0
        };

        trace!(
            cursor = self.cursor,
            interval,
            t,
            speed,
            buffered = buffer.len(),
            "interpolation step"
        );

        Some(InterpolatedFrame {
            start,
            goal,
            interpolated: Snapshot::interpolate(&start, &goal, t),
            t,
            staleness: now - start.local_timestamp,
        })
    }

    fn interval_of(buffer: &TimeBuffer) -> Option<f64> {
        buffer
            .interval()
            .map(|(start, goal)| goal.remote_timestamp - start.remote_timestamp)
    }

    /// Current virtual time within the interval
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Catch-up settings in use
    pub fn catchup(&self) -> CatchupSettings {
        self.catchup
    }

    /// Replace the catch-up settings
    pub fn set_catchup(&mut self, catchup: CatchupSettings) {
        self.catchup = catchup;
    }

    /// Rewind the cursor to 0
    pub fn reset(&mut self) {
        self.cursor = 0.0;
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new(CatchupSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_core::{Transform, Vec3};

    fn snap(ts: f64, y: f32) -> Snapshot {
        Snapshot::new(ts, ts, Transform::from_position(Vec3::new(0.0, y, 0.0)))
    }

    fn filled(limit: usize, stamps: &[(f64, f32)]) -> TimeBuffer {
        let mut buffer = TimeBuffer::new(limit);
        for &(ts, y) in stamps {
            buffer.insert(snap(ts, y));
        }
        buffer
    }

    #[test]
    fn test_needs_two_snapshots() {
        let mut interpolator = Interpolator::default();
        let mut buffer = filled(64, &[(0.0, 0.0)]);

        assert!(interpolator.advance(&mut buffer, 0.0, 0.1).is_none());
        assert_eq!(interpolator.cursor(), 0.0);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_half_way() {
        let mut interpolator = Interpolator::default();
        let mut buffer = filled(64, &[(0.0, 0.0), (1.0, 10.0)]);

        let frame = interpolator.advance(&mut buffer, 1.0, 0.5).unwrap();
        assert_eq!(frame.interpolated.position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(frame.t, 0.5);
        assert_eq!(frame.start.remote_timestamp, 0.0);
        assert_eq!(frame.goal.remote_timestamp, 1.0);
    }

    #[test]
    fn test_catchup_speed_factor() {
        let settings = CatchupSettings::new(4, 0.1);
        assert!((settings.speed_factor(10) - 1.6).abs() < 1e-12);
        assert_eq!(settings.speed_factor(4), 1.0);
        assert_eq!(settings.speed_factor(0), 1.0);
    }

    #[test]
    fn test_catchup_advances_cursor_faster() {
        let mut interpolator = Interpolator::new(CatchupSettings::new(4, 0.1));
        let stamps: Vec<(f64, f32)> = (0..10).map(|i| (i as f64, i as f32)).collect();
        let mut buffer = filled(64, &stamps);

        interpolator.advance(&mut buffer, 0.0, 0.1).unwrap();
        assert!((interpolator.cursor() - 0.16).abs() < 1e-9);
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn test_consumes_passed_snapshots_and_carries_remainder() {
        let mut interpolator = Interpolator::default();
        let mut buffer = filled(64, &[(0.0, 0.0), (1.0, 10.0), (2.0, 20.0), (3.0, 30.0)]);

        let frame = interpolator.advance(&mut buffer, 0.0, 2.5).unwrap();
        assert_eq!(buffer.len(), 2);
        assert!((interpolator.cursor() - 0.5).abs() < 1e-12);
        assert_eq!(frame.start.remote_timestamp, 2.0);
        assert_eq!(frame.interpolated.position, Vec3::new(0.0, 25.0, 0.0));
    }

    #[test]
    fn test_underrun_holds_at_goal() {
        let mut interpolator = Interpolator::default();
        let mut buffer = filled(64, &[(0.0, 0.0), (1.0, 10.0)]);

        let frame = interpolator.advance(&mut buffer, 0.0, 5.0).unwrap();
        assert_eq!(interpolator.cursor(), 1.0);
        assert_eq!(frame.t, 1.0);
        assert_eq!(frame.interpolated.position, Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(buffer.len(), 2);

        // More data lets playback move on from the held goal
        buffer.insert(snap(2.0, 20.0));
        let frame = interpolator.advance(&mut buffer, 0.0, 0.25).unwrap();
        assert_eq!(buffer.len(), 2);
        assert_eq!(frame.start.remote_timestamp, 1.0);
        assert_eq!(frame.interpolated.position, Vec3::new(0.0, 12.5, 0.0));
    }

    #[test]
    fn test_negative_delta_never_rewinds() {
        let mut interpolator = Interpolator::default();
        let mut buffer = filled(64, &[(0.0, 0.0), (1.0, 10.0)]);

        interpolator.advance(&mut buffer, 0.0, 0.4).unwrap();
        interpolator.advance(&mut buffer, 0.0, -1.0).unwrap();
        interpolator.advance(&mut buffer, 0.0, f64::NAN).unwrap();
        assert!((interpolator.cursor() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_staleness_uses_local_clock() {
        let mut interpolator = Interpolator::default();
        let mut buffer = TimeBuffer::new(8);
        buffer.insert(Snapshot::new(0.0, 100.0, Transform::IDENTITY));
        buffer.insert(Snapshot::new(1.0, 100.5, Transform::IDENTITY));

        let frame = interpolator.advance(&mut buffer, 101.0, 0.1).unwrap();
        assert_eq!(frame.staleness, 1.0);
    }

    #[test]
    fn test_reset() {
        let mut interpolator = Interpolator::default();
        let mut buffer = filled(64, &[(0.0, 0.0), (1.0, 10.0)]);
        interpolator.advance(&mut buffer, 0.0, 0.3).unwrap();

        interpolator.reset();
        assert_eq!(interpolator.cursor(), 0.0);
    }
}
