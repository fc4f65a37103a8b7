use glam::{Quat, Vec3};
use std::ops::Mul;

/// Rigid pose: a position and an orientation.
///
/// Composition follows the parent/child convention: `parent * local` yields the
/// child's pose in the parent's space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.position
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: rotation * -self.position,
            rotation,
        }
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            position: self.transform_point(rhs.position),
            rotation: (self.rotation * rhs.rotation).normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn composition_places_child_in_parent_space() {
        let parent = Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2));
        let child = Transform::from_position(Vec3::new(0.0, 0.0, 1.0));

        let world = parent * child;

        // +Z rotated a quarter turn around +Y lands on +X.
        assert_abs_diff_eq!(world.position, Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn basis_follows_rotation() {
        let t = Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2));

        assert_abs_diff_eq!(t.forward(), Vec3::X, epsilon = 1e-5);
        assert_abs_diff_eq!(t.up(), Vec3::Y, epsilon = 1e-5);
        assert_abs_diff_eq!(t.right(), -Vec3::Z, epsilon = 1e-5);
    }

    #[test]
    fn inverse_undoes_composition() {
        let a = Transform::new(Vec3::new(0.3, -1.0, 2.0), Quat::from_rotation_x(0.7));
        let b = Transform::new(Vec3::new(-0.5, 0.2, 0.1), Quat::from_rotation_z(-1.1));

        let back = a.inverse() * (a * b);

        assert_abs_diff_eq!(back.position, b.position, epsilon = 1e-5);
        assert!(back.rotation.dot(b.rotation).abs() > 0.99999);
    }
}
