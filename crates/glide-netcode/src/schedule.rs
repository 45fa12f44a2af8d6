//! Send scheduling
//!
//! Two independent questions decide whether an entity sends on a tick:
//! - has a send interval elapsed ([`should_send_now`])
//! - with move gating on, has the entity moved ([`MoveGate`])

use glide_core::Vec3;

/// True once `interval` seconds have passed since `last_send`
pub fn should_send_now(now: f64, last_send: f64, interval: f64) -> bool {
    now >= last_send + interval
}

/// Suppresses sends while an entity is not moving
///
/// After motion stops exactly one duplicate of the final position still goes
/// out. The receiver then holds two identical terminal snapshots, so
/// interpolation finishes the last leg instead of freezing part way along
/// it. Every send after that is skipped until the position changes.
#[derive(Debug, Clone, Default)]
pub struct MoveGate {
    /// Position included in the most recent send
    last_position: Option<Vec3>,
    /// The mandatory duplicate for `last_position` has gone out
    sent_unchanged: bool,
}

impl MoveGate {
    /// Create a gate that has seen no sends yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a send of `position` should be skipped
    pub fn should_skip(&self, position: Vec3) -> bool {
        self.sent_unchanged && self.is_unchanged(position)
    }

    /// Record that `position` was just sent
    pub fn record_send(&mut self, position: Vec3) {
        if self.is_unchanged(position) {
            self.sent_unchanged = true;
        } else {
            self.sent_unchanged = false;
            self.last_position = Some(position);
        }
    }

    /// Forget all history, so the next send always goes out
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // Bitwise, so -0.0 and 0.0 count as a move and NaN never matches itself
    fn is_unchanged(&self, position: Vec3) -> bool {
        let bits = |v: Vec3| v.to_array().map(f32::to_bits);
        self.last_position
            .is_some_and(|last| bits(last) == bits(position))
    }
}
