use glam::Quat;

use super::config::WristTorsionLimits;
use crate::math::{project_on_plane, signed_angle};
use crate::skeleton::UniversalLocalAxes;

const WRAP_THRESHOLD: f32 = 150.0;
const DEGENERATE_SQ: f32 = 1e-8;

/// Tracks the twist of the hand around the forearm across frames.
///
/// The raw twist only lives in (-180, 180]; crossing that seam between two
/// updates bumps an overshoot counter so the reported angle keeps going past a
/// half turn. Leaving the configured window drops back to the raw angle, clamped
/// into the window.
#[derive(Debug, Clone, PartialEq)]
pub struct WristTorsion {
    limits: WristTorsionLimits,
    angle: f32,
    last_raw: f32,
    overshoot: i32,
}

impl WristTorsion {
    pub fn new(limits: WristTorsionLimits) -> Self {
        Self {
            limits,
            angle: 0.0,
            last_raw: 0.0,
            overshoot: 0,
        }
    }

    pub fn limits(&self) -> WristTorsionLimits {
        self.limits
    }

    /// Latest unwrapped torsion, degrees.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn reset(&mut self) {
        self.angle = 0.0;
        self.last_raw = 0.0;
        self.overshoot = 0;
    }

    /// Feeds the current forearm and hand world rotations, returns the unwrapped torsion.
    pub fn update(
        &mut self,
        forearm_rotation: Quat,
        forearm_axes: &UniversalLocalAxes,
        hand_rotation: Quat,
        hand_axes: &UniversalLocalAxes,
    ) -> f32 {
        let raw = raw_torsion(forearm_rotation, forearm_axes, hand_rotation, hand_axes);

        if self.last_raw > WRAP_THRESHOLD && raw < -WRAP_THRESHOLD {
            self.overshoot += 1;
        } else if self.last_raw < -WRAP_THRESHOLD && raw > WRAP_THRESHOLD {
            self.overshoot -= 1;
        }
        self.last_raw = raw;

        let unwrapped = raw + 360.0 * self.overshoot as f32;
        self.angle = if self.limits.contains(unwrapped) {
            unwrapped
        } else {
            self.overshoot = 0;
            raw.max(self.limits.min_angle).min(self.limits.max_angle)
        };
        self.angle
    }
}

/// Twist of the hand relative to the forearm around the forearm's forward axis,
/// within (-180, 180].
pub fn raw_torsion(
    forearm_rotation: Quat,
    forearm_axes: &UniversalLocalAxes,
    hand_rotation: Quat,
    hand_axes: &UniversalLocalAxes,
) -> f32 {
    let to_forearm = forearm_rotation.inverse();
    let forward = forearm_axes.local_forward;

    let hand_right = to_forearm * hand_axes.world_right(hand_rotation);
    let projected = project_on_plane(hand_right, forward);
    if projected.length_squared() > DEGENERATE_SQ {
        return signed_angle(forearm_axes.local_right, projected, forward);
    }

    let hand_up = to_forearm * hand_axes.world_up(hand_rotation);
    let projected = project_on_plane(hand_up, forward);
    signed_angle(forearm_axes.local_up, projected, forward)
}
