use super::arm::{ArmIkSolver, ArmSolveContext};
use super::body::{ArmSample, BodyIk};
use super::config::AvatarIkConfig;
use crate::error::RigError;
use crate::math::Transform;
use crate::rig::{AvatarRig, AvatarRigInfo, Side};
use crate::skeleton::{BoneId, Skeleton, SkeletonPose};

/// Tracked poses for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Head-mounted camera (the eyes), +Z looking forward.
    pub camera: Transform,
    /// Hand targets. `None` leaves the hand bone where it is.
    pub left_hand: Option<Transform>,
    pub right_hand: Option<Transform>,
    pub delta_time: f32,
}

impl FrameInput {
    pub fn new(camera: Transform, delta_time: f32) -> Self {
        Self {
            camera,
            left_hand: None,
            right_hand: None,
            delta_time,
        }
    }

    pub fn with_hands(mut self, left: Transform, right: Transform) -> Self {
        self.left_hand = Some(left);
        self.right_hand = Some(right);
        self
    }

    pub fn hand(&self, side: Side) -> Option<Transform> {
        match side {
            Side::Left => self.left_hand,
            Side::Right => self.right_hand,
        }
    }
}

/// Full upper-body IK for one avatar.
///
/// Per frame: hand targets are written, the body is placed under the camera,
/// both arms are solved, then the torso twists after the elbows.
#[derive(Debug, Clone)]
pub struct AvatarIk {
    root: BoneId,
    body: Option<BodyIk>,
    left_arm: Option<ArmIkSolver>,
    right_arm: Option<ArmIkSolver>,
}

impl AvatarIk {
    /// Binds to the skeleton's current pose, which must be the rest pose.
    pub fn new(skel: &Skeleton, rig: &AvatarRig, config: &AvatarIkConfig) -> Result<Self, RigError> {
        let info = AvatarRigInfo::compute(skel, rig)?;
        Ok(Self::from_info(skel, info, config))
    }

    pub fn from_info(skel: &Skeleton, info: AvatarRigInfo, config: &AvatarIkConfig) -> Self {
        let avatar_rotation = skel.rotation(info.root);
        let arm = |arm, arm_config| {
            ArmIkSolver::new(skel, arm, arm_config, config.wrist_torsion, avatar_rotation)
        };

        Self {
            root: info.root,
            body: info
                .body
                .map(|body| BodyIk::new(skel, info.root, body, config.body)),
            left_arm: info.left_arm.map(|info| arm(info, config.left_arm)),
            right_arm: info.right_arm.map(|info| arm(info, config.right_arm)),
        }
    }

    pub fn body(&self) -> Option<&BodyIk> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut BodyIk> {
        self.body.as_mut()
    }

    pub fn arm(&self, side: Side) -> Option<&ArmIkSolver> {
        match side {
            Side::Left => self.left_arm.as_ref(),
            Side::Right => self.right_arm.as_ref(),
        }
    }

    pub fn arm_mut(&mut self, side: Side) -> Option<&mut ArmIkSolver> {
        match side {
            Side::Left => self.left_arm.as_mut(),
            Side::Right => self.right_arm.as_mut(),
        }
    }

    pub fn update(&mut self, skel: &mut Skeleton, frame: &FrameInput) {
        for side in [Side::Left, Side::Right] {
            if let (Some(arm), Some(target)) = (self.arm(side), frame.hand(side)) {
                skel.set_world_transform(arm.info().hand.bone, target);
            }
        }

        if let Some(body) = &mut self.body {
            body.pre_solve(skel, &frame.camera, frame.delta_time);
        }

        let avatar_rotation = skel.rotation(self.root);
        for side in [Side::Left, Side::Right] {
            let mut ctx = ArmSolveContext::new(avatar_rotation, frame.delta_time);
            ctx.other_shoulder = self
                .arm(side.mirror())
                .map(|other| skel.position(other.info().upper_arm.bone));
            if let Some(arm) = self.arm_mut(side) {
                arm.solve(skel, &ctx);
            }
        }

        if let Some(body) = &mut self.body {
            let samples: Vec<ArmSample> = [&self.left_arm, &self.right_arm]
                .into_iter()
                .flatten()
                .map(|arm| ArmSample {
                    side: arm.side(),
                    shoulder: skel.position(arm.info().upper_arm.bone),
                    elbow: skel.position(arm.info().forearm.bone),
                })
                .collect();
            body.post_solve(skel, &samples, frame.delta_time);
        }
    }

    /// Returns every solver to its freshly bound state.
    pub fn reset(&mut self) {
        if let Some(body) = &mut self.body {
            body.reset();
        }
        for arm in [&mut self.left_arm, &mut self.right_arm].into_iter().flatten() {
            arm.reset();
        }
    }
}
