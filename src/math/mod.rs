//! Math utilities module
//!
//! Rigid transforms plus the angle helpers every solver shares. Angles exposed by
//! this crate are in degrees; conventions are +X right, +Y up, +Z forward.

mod angles;
mod transform;

pub use angles::{
    angle, look_rotation, normalize_angle, project_on_plane, rotate_towards, signed_angle, slerp_direction, twist_angle,
};
pub use transform::Transform;

// Re-export commonly used glam types
pub use glam::{Mat3, Quat, Vec3};
