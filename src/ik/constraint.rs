use glam::{Quat, Vec3};

/// Keeps a direction inside a cone around a reference direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeLimit {
    /// Half-angle of the cone, radians.
    pub max_angle: f32,
}

impl ConeLimit {
    pub fn new(max_angle_degrees: f32) -> Self {
        Self {
            max_angle: max_angle_degrees.max(0.0).to_radians(),
        }
    }

    pub fn contains(&self, direction: Vec3, reference: Vec3) -> bool {
        direction.angle_between(reference) <= self.max_angle
    }

    /// Normalized `direction`, rotated back onto the cone surface when outside.
    ///
    /// Degenerate inputs return the normalized reference.
    pub fn apply(&self, direction: Vec3, reference: Vec3) -> Vec3 {
        let dir = direction.normalize_or_zero();
        let ref_dir = reference.normalize_or_zero();

        if dir == Vec3::ZERO || ref_dir == Vec3::ZERO {
            return ref_dir;
        }

        if dir.angle_between(ref_dir) <= self.max_angle {
            return dir;
        }

        let axis = match ref_dir.cross(dir).try_normalize() {
            Some(axis) => axis,
            // Opposite the reference: any great circle works.
            None => ref_dir.any_orthonormal_vector(),
        };
        Quat::from_axis_angle(axis, self.max_angle) * ref_dir
    }
}
