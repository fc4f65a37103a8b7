use glam::{Quat, Vec3};

use super::{ArmRig, AvatarRig, BodyRig, ForearmTwist, Side};
use crate::error::RigError;
use crate::skeleton::{BoneId, Skeleton, SkeletonPose, UniversalLocalAxes};

const MIN_BONE_LENGTH: f32 = 1e-4;

/// A bone paired with the universal axes captured for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneAxes {
    pub bone: BoneId,
    pub axes: UniversalLocalAxes,
}

/// Bind-time information about one arm.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmInfo {
    pub side: Side,
    pub clavicle: Option<BoneAxes>,
    pub upper_arm: BoneAxes,
    pub forearm: BoneAxes,
    pub hand: BoneAxes,
    pub twists: Vec<(ForearmTwist, UniversalLocalAxes)>,
    pub upper_arm_length: f32,
    pub forearm_length: f32,
}

impl ArmInfo {
    /// Captures axes and rest lengths.
    ///
    /// Returns `Ok(None)` when the rig lacks one of upper arm, forearm or hand.
    pub fn compute(
        skel: &Skeleton,
        rig: &ArmRig,
        avatar_rotation: Quat,
    ) -> Result<Option<Self>, RigError> {
        let clavicle = checked(skel, rig.clavicle, "clavicle")?;
        let upper_arm = checked(skel, rig.upper_arm, "upper arm")?;
        let forearm = checked(skel, rig.forearm, "forearm")?;
        let hand = checked(skel, rig.hand, "hand")?;
        for twist in &rig.forearm_twists {
            checked(skel, Some(twist.bone), "forearm twist")?;
        }

        let (Some(upper_arm), Some(forearm), Some(hand)) = (upper_arm, forearm, hand) else {
            log::warn!(
                "{:?} arm is missing upper arm, forearm or hand; arm IK disabled",
                rig.side
            );
            return Ok(None);
        };

        let up = avatar_rotation * Vec3::Y;
        let shoulder_pos = skel.position(upper_arm);
        let elbow_pos = skel.position(forearm);
        let wrist_pos = skel.position(hand);

        let upper_arm_length = rest_length(shoulder_pos, elbow_pos, "upper arm")?;
        let forearm_length = rest_length(elbow_pos, wrist_pos, "forearm")?;

        let arm_dir = elbow_pos - shoulder_pos;
        let forearm_dir = wrist_pos - elbow_pos;

        let clavicle = clavicle.map(|bone| {
            let mut direction = shoulder_pos - skel.position(bone);
            if direction.length_squared() < MIN_BONE_LENGTH * MIN_BONE_LENGTH {
                direction = arm_dir;
            }
            BoneAxes {
                bone,
                axes: UniversalLocalAxes::along(skel, bone, direction, up),
            }
        });

        let twists = rig
            .forearm_twists
            .iter()
            .map(|twist| {
                (
                    *twist,
                    UniversalLocalAxes::along(skel, twist.bone, forearm_dir, up),
                )
            })
            .collect();

        log::debug!(
            "{:?} arm bound: upper arm {upper_arm_length:.3}, forearm {forearm_length:.3}",
            rig.side
        );

        Ok(Some(Self {
            side: rig.side,
            clavicle,
            upper_arm: BoneAxes {
                bone: upper_arm,
                axes: UniversalLocalAxes::along(skel, upper_arm, arm_dir, up),
            },
            forearm: BoneAxes {
                bone: forearm,
                axes: UniversalLocalAxes::along(skel, forearm, forearm_dir, up),
            },
            hand: BoneAxes {
                bone: hand,
                axes: UniversalLocalAxes::along(skel, hand, forearm_dir, up),
            },
            twists,
            upper_arm_length,
            forearm_length,
        }))
    }

    pub fn reach(&self) -> f32 {
        self.upper_arm_length + self.forearm_length
    }
}

/// Bind-time information about the upper body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyInfo {
    pub pivot: BoneAxes,
    pub head: BoneAxes,
    pub neck: Option<BoneAxes>,
    pub spine: Option<BoneAxes>,
    pub chest: Option<BoneAxes>,
    pub upper_chest: Option<BoneAxes>,
    pub independent: Vec<BoneId>,
}

impl BodyInfo {
    /// Returns `Ok(None)` when the rig lacks a pivot or a head.
    pub fn compute(
        skel: &Skeleton,
        rig: &BodyRig,
        avatar_rotation: Quat,
    ) -> Result<Option<Self>, RigError> {
        let axes = |bone: Option<BoneId>, role: &'static str| -> Result<Option<BoneAxes>, RigError> {
            Ok(checked(skel, bone, role)?.map(|bone| BoneAxes {
                bone,
                axes: UniversalLocalAxes::from_avatar(skel, bone, avatar_rotation),
            }))
        };

        let pivot = axes(rig.pivot, "body pivot")?;
        let head = axes(rig.head, "head")?;
        let neck = axes(rig.neck, "neck")?;
        let spine = axes(rig.spine, "spine")?;
        let chest = axes(rig.chest, "chest")?;
        let upper_chest = axes(rig.upper_chest, "upper chest")?;
        for bone in &rig.independent {
            checked(skel, Some(*bone), "independent bone")?;
        }

        let (Some(pivot), Some(head)) = (pivot, head) else {
            log::warn!("body rig is missing a pivot or a head; body IK disabled");
            return Ok(None);
        };

        Ok(Some(Self {
            pivot,
            head,
            neck,
            spine,
            chest,
            upper_chest,
            independent: rig.independent.clone(),
        }))
    }

    /// Spine segments that exist, root to tip.
    pub fn segments(&self) -> impl Iterator<Item = &BoneAxes> {
        [&self.spine, &self.chest, &self.upper_chest]
            .into_iter()
            .flatten()
    }
}

/// Everything the solvers need to know about an avatar, computed once per bind.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarRigInfo {
    pub root: BoneId,
    pub body: Option<BodyInfo>,
    pub left_arm: Option<ArmInfo>,
    pub right_arm: Option<ArmInfo>,
}

impl AvatarRigInfo {
    pub fn compute(skel: &Skeleton, rig: &AvatarRig) -> Result<Self, RigError> {
        checked(skel, Some(rig.root), "avatar root")?;
        let avatar_rotation = skel.rotation(rig.root);

        Ok(Self {
            root: rig.root,
            body: BodyInfo::compute(skel, &rig.body, avatar_rotation)?,
            left_arm: ArmInfo::compute(skel, &rig.left_arm, avatar_rotation)?,
            right_arm: ArmInfo::compute(skel, &rig.right_arm, avatar_rotation)?,
        })
    }

    pub fn arm(&self, side: Side) -> Option<&ArmInfo> {
        match side {
            Side::Left => self.left_arm.as_ref(),
            Side::Right => self.right_arm.as_ref(),
        }
    }
}

fn checked(
    skel: &Skeleton,
    bone: Option<BoneId>,
    role: &'static str,
) -> Result<Option<BoneId>, RigError> {
    match bone {
        Some(bone) if !skel.contains(bone) => Err(RigError::UnknownBone { role, bone }),
        other => Ok(other),
    }
}

fn rest_length(from: Vec3, to: Vec3, role: &'static str) -> Result<f32, RigError> {
    let length = from.distance(to);
    if length < MIN_BONE_LENGTH {
        return Err(RigError::DegenerateBone { role, length });
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::HumanoidBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn measures_arm_lengths_from_rest_pose() {
        let humanoid = HumanoidBuilder::new()
            .upper_arm_length(0.3)
            .forearm_length(0.25)
            .build();

        let info = AvatarRigInfo::compute(&humanoid.skeleton, &humanoid.rig).unwrap();
        let right = info.arm(Side::Right).unwrap();

        assert_relative_eq!(right.upper_arm_length, 0.3, epsilon = 1e-5);
        assert_relative_eq!(right.forearm_length, 0.25, epsilon = 1e-5);
        assert!(info.body.is_some());
        assert!(right.clavicle.is_some());
    }

    #[test]
    fn incomplete_arm_is_disabled_not_an_error() {
        let mut humanoid = HumanoidBuilder::new().build();
        humanoid.rig.left_arm.hand = None;

        let info = AvatarRigInfo::compute(&humanoid.skeleton, &humanoid.rig).unwrap();

        assert!(info.left_arm.is_none());
        assert!(info.right_arm.is_some());
    }

    #[test]
    fn unknown_bone_is_rejected() {
        let mut humanoid = HumanoidBuilder::new().build();
        humanoid.rig.right_arm.forearm = Some(BoneId(999));

        let err = AvatarRigInfo::compute(&humanoid.skeleton, &humanoid.rig).unwrap_err();

        assert_eq!(
            err,
            RigError::UnknownBone {
                role: "forearm",
                bone: BoneId(999)
            }
        );
    }

    #[test]
    fn zero_length_arm_is_rejected() {
        let mut skel = Skeleton::new();
        let root = skel.add_bone_world("root", None, Vec3::ZERO, Quat::IDENTITY);
        let upper = skel.add_bone_world("upper", Some(root), Vec3::X, Quat::IDENTITY);
        let fore = skel.add_bone_world("fore", Some(upper), Vec3::X, Quat::IDENTITY);
        let hand = skel.add_bone_world("hand", Some(fore), Vec3::X * 2.0, Quat::IDENTITY);
        let rig = ArmRig::new(Side::Right)
            .with_upper_arm(upper)
            .with_forearm(fore)
            .with_hand(hand);

        let err = ArmInfo::compute(&skel, &rig, Quat::IDENTITY).unwrap_err();

        assert!(matches!(err, RigError::DegenerateBone { role: "upper arm", .. }));
    }
}
