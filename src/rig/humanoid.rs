//! Procedural T-pose humanoid used by the demo and the tests.

use glam::{Quat, Vec3};

use super::{ArmRig, AvatarRig, BodyRig, Side};
use crate::skeleton::{BoneId, Skeleton};

/// A generated skeleton and the rig describing it.
#[derive(Debug, Clone)]
pub struct Humanoid {
    pub skeleton: Skeleton,
    pub rig: AvatarRig,
}

/// Builds an upright humanoid facing +Z, arms stretched along ±X.
#[derive(Debug, Clone)]
pub struct HumanoidBuilder {
    hip_height: f32,
    shoulder_height: f32,
    shoulder_half_width: f32,
    clavicle_offset: f32,
    neck_height: f32,
    head_height: f32,
    upper_arm_length: f32,
    forearm_length: f32,
    clavicles: bool,
    forearm_twist: bool,
    native_arm_rotation: Quat,
}

impl Default for HumanoidBuilder {
    fn default() -> Self {
        Self {
            hip_height: 1.0,
            shoulder_height: 1.45,
            shoulder_half_width: 0.18,
            clavicle_offset: 0.03,
            neck_height: 1.5,
            head_height: 1.6,
            upper_arm_length: 0.28,
            forearm_length: 0.26,
            clavicles: true,
            forearm_twist: false,
            native_arm_rotation: Quat::IDENTITY,
        }
    }
}

impl HumanoidBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upper_arm_length(mut self, length: f32) -> Self {
        self.upper_arm_length = length;
        self
    }

    pub fn forearm_length(mut self, length: f32) -> Self {
        self.forearm_length = length;
        self
    }

    pub fn shoulder_height(mut self, height: f32) -> Self {
        self.shoulder_height = height;
        self
    }

    pub fn clavicles(mut self, enabled: bool) -> Self {
        self.clavicles = enabled;
        self
    }

    pub fn forearm_twist(mut self, enabled: bool) -> Self {
        self.forearm_twist = enabled;
        self
    }

    /// World rotation given to every arm bone at rest, emulating rigs whose bone
    /// axes do not follow the canonical convention.
    pub fn native_arm_rotation(mut self, rotation: Quat) -> Self {
        self.native_arm_rotation = rotation;
        self
    }

    pub fn build(&self) -> Humanoid {
        let mut skel = Skeleton::new();
        let up = |h: f32| Vec3::new(0.0, h, 0.0);

        let root = skel.add_bone_world("root", None, Vec3::ZERO, Quat::IDENTITY);
        let hips = skel.add_bone_world("hips", Some(root), up(self.hip_height), Quat::IDENTITY);

        let torso_span = self.shoulder_height - self.hip_height;
        let spine = skel.add_bone_world(
            "spine",
            Some(hips),
            up(self.hip_height + torso_span * 0.2),
            Quat::IDENTITY,
        );
        let chest = skel.add_bone_world(
            "chest",
            Some(spine),
            up(self.hip_height + torso_span * 0.5),
            Quat::IDENTITY,
        );
        let upper_chest = skel.add_bone_world(
            "upper_chest",
            Some(chest),
            up(self.hip_height + torso_span * 0.8),
            Quat::IDENTITY,
        );
        let neck = skel.add_bone_world("neck", Some(upper_chest), up(self.neck_height), Quat::IDENTITY);
        let head = skel.add_bone_world("head", Some(neck), up(self.head_height), Quat::IDENTITY);

        let mut body = BodyRig::new()
            .with_pivot(hips)
            .with_spine(spine)
            .with_chest(chest)
            .with_upper_chest(upper_chest)
            .with_neck(neck)
            .with_head(head);

        let left_arm = self.build_arm(&mut skel, upper_chest, Side::Left);
        let right_arm = self.build_arm(&mut skel, upper_chest, Side::Right);
        for arm in [&left_arm, &right_arm] {
            if let Some(hand) = arm.hand {
                body = body.with_independent(hand);
            }
        }

        log::debug!("built humanoid with {} bones", skel.len());

        Humanoid {
            skeleton: skel,
            rig: AvatarRig {
                root,
                body,
                left_arm,
                right_arm,
            },
        }
    }

    fn build_arm(&self, skel: &mut Skeleton, attach: BoneId, side: Side) -> ArmRig {
        let prefix = match side {
            Side::Left => "left",
            Side::Right => "right",
        };
        let outward = Vec3::X * side.sign();
        let shoulder = Vec3::new(0.0, self.shoulder_height, 0.0) + outward * self.shoulder_half_width;
        let elbow = shoulder + outward * self.upper_arm_length;
        let wrist = elbow + outward * self.forearm_length;
        let native = self.native_arm_rotation;

        let mut rig = ArmRig::new(side);
        let mut parent = attach;
        if self.clavicles {
            let clavicle = skel.add_bone_world(
                format!("{prefix}_clavicle"),
                Some(attach),
                Vec3::new(0.0, self.shoulder_height, 0.0) + outward * self.clavicle_offset,
                native,
            );
            rig = rig.with_clavicle(clavicle);
            parent = clavicle;
        }

        let upper_arm = skel.add_bone_world(format!("{prefix}_upper_arm"), Some(parent), shoulder, native);
        let forearm = skel.add_bone_world(format!("{prefix}_forearm"), Some(upper_arm), elbow, native);
        rig = rig.with_upper_arm(upper_arm).with_forearm(forearm);

        if self.forearm_twist {
            let twist = skel.add_bone_world(
                format!("{prefix}_forearm_twist"),
                Some(forearm),
                elbow.lerp(wrist, 0.5),
                native,
            );
            rig = rig.with_forearm_twist(twist, 0.5);
        }

        let hand = skel.add_bone_world(format!("{prefix}_hand"), Some(forearm), wrist, native);
        rig.with_hand(hand)
    }
}
