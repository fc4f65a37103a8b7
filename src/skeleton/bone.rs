use glam::{Quat, Vec3};

use super::pose::SkeletonPose;
use crate::math::Transform;

/// A bone identifier (index into a [`Skeleton`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneId(pub u32);

impl BoneId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneId>,
    /// Pose relative to the parent (world pose for roots).
    pub local: Transform,
}

impl Bone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            local: Transform::IDENTITY,
        }
    }

    pub fn with_parent(mut self, parent: BoneId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_local(mut self, local: Transform) -> Self {
        self.local = local;
        self
    }
}

/// Arena of bones. Parents must be added before their children.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bone`. Its parent must already be in the skeleton.
    pub fn add_bone(&mut self, bone: Bone) -> BoneId {
        debug_assert!(
            bone.parent.map_or(true, |p| p.index() < self.bones.len()),
            "bone {:?} added before its parent {:?}",
            bone.name,
            bone.parent
        );
        let id = BoneId(self.bones.len() as u32);
        self.bones.push(bone);
        id
    }

    /// Adds a bone authored in world space under `parent`.
    pub fn add_bone_world(
        &mut self,
        name: impl Into<String>,
        parent: Option<BoneId>,
        position: Vec3,
        rotation: Quat,
    ) -> BoneId {
        let world = Transform::new(position, rotation);
        let local = match parent {
            Some(parent) => self.world_transform(parent).inverse() * world,
            None => world,
        };
        self.add_bone(Bone {
            name: name.into(),
            parent,
            local,
        })
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn contains(&self, id: BoneId) -> bool {
        id.index() < self.bones.len()
    }

    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.index())
    }

    pub fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.bones
            .iter()
            .position(|b| b.name == name)
            .map(|i| BoneId(i as u32))
    }

    pub fn children(&self, id: BoneId) -> impl Iterator<Item = BoneId> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.parent == Some(id))
            .map(|(i, _)| BoneId(i as u32))
    }
}

impl SkeletonPose for Skeleton {
    fn parent(&self, bone: BoneId) -> Option<BoneId> {
        self.bones[bone.index()].parent
    }

    fn local_transform(&self, bone: BoneId) -> Transform {
        self.bones[bone.index()].local
    }

    fn set_local_transform(&mut self, bone: BoneId, local: Transform) {
        self.bones[bone.index()].local = local;
    }
}
