use glam::{Quat, Vec3};

use super::{BoneId, SkeletonPose};
use crate::math::{look_rotation, project_on_plane};

/// Maps a bone's native local axes onto the canonical right/up/forward convention.
///
/// Solvers work with *universal* rotations (canonical +X right, +Y up, +Z forward)
/// and convert to the bone's *actual* rotation with a fixed correction:
/// `actual = universal * universal_to_actual`.
///
/// Captured once from the rest pose and never recomputed unless the skeleton is
/// rebound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniversalLocalAxes {
    pub local_right: Vec3,
    pub local_up: Vec3,
    pub local_forward: Vec3,
    universal_to_actual: Quat,
    initial_local_rotation: Quat,
}

impl UniversalLocalAxes {
    /// Builds the mapping from world-space directions describing the bone at rest.
    ///
    /// `forward` wins over `up`; `up` is re-orthogonalized against it.
    pub fn from_world_axes<S: SkeletonPose + ?Sized>(
        skel: &S,
        bone: BoneId,
        up: Vec3,
        forward: Vec3,
    ) -> Self {
        let canonical = look_rotation(forward, up);
        let world = skel.world_transform(bone);
        let to_local = world.rotation.inverse();

        let local_forward = (to_local * (canonical * Vec3::Z)).normalize();
        let local_up = (to_local * (canonical * Vec3::Y)).normalize();
        let local_right = local_up.cross(local_forward).normalize();

        let actual_to_universal = look_rotation(local_forward, local_up);
        let universal_to_actual = actual_to_universal.inverse();

        let initial_local_rotation = skel.local_rotation(bone);

        Self {
            local_right,
            local_up,
            local_forward,
            universal_to_actual,
            initial_local_rotation,
        }
    }

    /// Forward along `direction` (typically toward the child bone), up taken from
    /// `up_hint` flattened against it.
    pub fn along<S: SkeletonPose + ?Sized>(
        skel: &S,
        bone: BoneId,
        direction: Vec3,
        up_hint: Vec3,
    ) -> Self {
        let mut up = project_on_plane(up_hint, direction);
        if up.length_squared() < 1e-8 {
            up = direction.any_orthonormal_vector();
        }
        Self::from_world_axes(skel, bone, up, direction)
    }

    /// Universal axes aligned with the avatar's own frame.
    pub fn from_avatar<S: SkeletonPose + ?Sized>(
        skel: &S,
        bone: BoneId,
        avatar_rotation: Quat,
    ) -> Self {
        Self::from_world_axes(skel, bone, avatar_rotation * Vec3::Y, avatar_rotation * Vec3::Z)
    }

    pub fn universal_to_actual(&self) -> Quat {
        self.universal_to_actual
    }

    pub fn actual_to_universal(&self) -> Quat {
        self.universal_to_actual.inverse()
    }

    pub fn initial_local_rotation(&self) -> Quat {
        self.initial_local_rotation
    }

    /// Native bone rotation for a canonical world rotation.
    pub fn actual_rotation(&self, universal: Quat) -> Quat {
        (universal * self.universal_to_actual).normalize()
    }

    /// Canonical world rotation for a native bone rotation.
    pub fn universal_rotation(&self, actual: Quat) -> Quat {
        (actual * self.actual_to_universal()).normalize()
    }

    pub fn world_right(&self, actual: Quat) -> Vec3 {
        actual * self.local_right
    }

    pub fn world_up(&self, actual: Quat) -> Vec3 {
        actual * self.local_up
    }

    pub fn world_forward(&self, actual: Quat) -> Vec3 {
        actual * self.local_forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Skeleton;
    use approx::assert_abs_diff_eq;

    #[test]
    fn corrects_arbitrary_native_orientation() {
        let mut skel = Skeleton::new();
        // Native axes deliberately scrambled: the bone's local +Y points along world +X.
        let native = Quat::from_rotation_z(-90f32.to_radians()) * Quat::from_rotation_y(0.4);
        let bone = skel.add_bone_world("arm", None, Vec3::ZERO, native);

        let axes = UniversalLocalAxes::along(&skel, bone, Vec3::X, Vec3::Y);
        let actual = skel.rotation(bone);

        assert_abs_diff_eq!(axes.world_forward(actual), Vec3::X, epsilon = 1e-5);
        assert_abs_diff_eq!(axes.world_up(actual), Vec3::Y, epsilon = 1e-5);
        assert_abs_diff_eq!(axes.world_right(actual), -Vec3::Z, epsilon = 1e-5);

        let universal = axes.universal_rotation(actual);
        assert_abs_diff_eq!(universal * Vec3::Z, Vec3::X, epsilon = 1e-5);
        assert!(axes.actual_rotation(universal).dot(actual).abs() > 0.99999);
    }

    #[test]
    fn avatar_axes_follow_avatar_frame() {
        let mut skel = Skeleton::new();
        let bone = skel.add_bone_world("head", None, Vec3::Y, Quat::from_rotation_x(0.8));
        let avatar = Quat::from_rotation_y(1.2);

        let axes = UniversalLocalAxes::from_avatar(&skel, bone, avatar);

        let universal = axes.universal_rotation(skel.rotation(bone));
        assert!(universal.dot(avatar).abs() > 0.99999);
    }
}
