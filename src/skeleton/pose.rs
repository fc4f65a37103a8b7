use glam::{Quat, Vec3};

use super::BoneId;
use crate::math::Transform;

/// Read/write access to a bone hierarchy.
///
/// Implementors only store local poses and parent links; world-space accessors are
/// derived by walking up the hierarchy, so writing a bone implicitly moves all of
/// its descendants.
pub trait SkeletonPose {
    fn parent(&self, bone: BoneId) -> Option<BoneId>;

    fn local_transform(&self, bone: BoneId) -> Transform;

    fn set_local_transform(&mut self, bone: BoneId, local: Transform);

    fn world_transform(&self, bone: BoneId) -> Transform {
        let local = self.local_transform(bone);
        match self.parent(bone) {
            Some(parent) => self.world_transform(parent) * local,
            None => local,
        }
    }

    /// World pose of the bone's parent, identity for roots.
    fn parent_transform(&self, bone: BoneId) -> Transform {
        self.parent(bone)
            .map(|parent| self.world_transform(parent))
            .unwrap_or(Transform::IDENTITY)
    }

    fn set_world_transform(&mut self, bone: BoneId, world: Transform) {
        let local = self.parent_transform(bone).inverse() * world;
        self.set_local_transform(bone, local);
    }

    fn position(&self, bone: BoneId) -> Vec3 {
        self.world_transform(bone).position
    }

    fn rotation(&self, bone: BoneId) -> Quat {
        self.world_transform(bone).rotation
    }

    fn set_position(&mut self, bone: BoneId, position: Vec3) {
        let mut world = self.world_transform(bone);
        world.position = position;
        self.set_world_transform(bone, world);
    }

    fn set_rotation(&mut self, bone: BoneId, rotation: Quat) {
        let mut world = self.world_transform(bone);
        world.rotation = rotation;
        self.set_world_transform(bone, world);
    }

    fn local_rotation(&self, bone: BoneId) -> Quat {
        self.local_transform(bone).rotation
    }

    fn set_local_rotation(&mut self, bone: BoneId, rotation: Quat) {
        let mut local = self.local_transform(bone);
        local.rotation = rotation;
        self.set_local_transform(bone, local);
    }
}
