//! Rig description
//!
//! Which skeleton bones play which role for the solvers. Roles are optional: a
//! solver whose required bones are missing simply does nothing.

pub mod humanoid;
mod info;

pub use humanoid::{Humanoid, HumanoidBuilder};
pub use info::{ArmInfo, AvatarRigInfo, BodyInfo, BoneAxes};

use crate::skeleton::BoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// `+1` for the right side, `-1` for the left.
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    pub fn mirror(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A forearm twist bone and the share of the wrist torsion it receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForearmTwist {
    pub bone: BoneId,
    pub fraction: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArmRig {
    pub side: Side,
    pub clavicle: Option<BoneId>,
    pub upper_arm: Option<BoneId>,
    pub forearm: Option<BoneId>,
    pub hand: Option<BoneId>,
    pub forearm_twists: Vec<ForearmTwist>,
}

impl ArmRig {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            clavicle: None,
            upper_arm: None,
            forearm: None,
            hand: None,
            forearm_twists: Vec::new(),
        }
    }

    pub fn with_clavicle(mut self, bone: BoneId) -> Self {
        self.clavicle = Some(bone);
        self
    }

    pub fn with_upper_arm(mut self, bone: BoneId) -> Self {
        self.upper_arm = Some(bone);
        self
    }

    pub fn with_forearm(mut self, bone: BoneId) -> Self {
        self.forearm = Some(bone);
        self
    }

    pub fn with_hand(mut self, bone: BoneId) -> Self {
        self.hand = Some(bone);
        self
    }

    pub fn with_forearm_twist(mut self, bone: BoneId, fraction: f32) -> Self {
        self.forearm_twists.push(ForearmTwist { bone, fraction });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyRig {
    /// Bone the body IK rotates and translates to follow the head.
    pub pivot: Option<BoneId>,
    pub spine: Option<BoneId>,
    pub chest: Option<BoneId>,
    pub upper_chest: Option<BoneId>,
    pub neck: Option<BoneId>,
    pub head: Option<BoneId>,
    /// Bones driven from outside (tracked hands) whose world pose must survive body moves.
    pub independent: Vec<BoneId>,
}

impl BodyRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pivot(mut self, bone: BoneId) -> Self {
        self.pivot = Some(bone);
        self
    }

    pub fn with_spine(mut self, bone: BoneId) -> Self {
        self.spine = Some(bone);
        self
    }

    pub fn with_chest(mut self, bone: BoneId) -> Self {
        self.chest = Some(bone);
        self
    }

    pub fn with_upper_chest(mut self, bone: BoneId) -> Self {
        self.upper_chest = Some(bone);
        self
    }

    pub fn with_neck(mut self, bone: BoneId) -> Self {
        self.neck = Some(bone);
        self
    }

    pub fn with_head(mut self, bone: BoneId) -> Self {
        self.head = Some(bone);
        self
    }

    pub fn with_independent(mut self, bone: BoneId) -> Self {
        self.independent.push(bone);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarRig {
    /// Avatar root; its rotation defines the avatar's up and forward.
    pub root: BoneId,
    pub body: BodyRig,
    pub left_arm: ArmRig,
    pub right_arm: ArmRig,
}

impl AvatarRig {
    pub fn new(root: BoneId) -> Self {
        Self {
            root,
            body: BodyRig::new(),
            left_arm: ArmRig::new(Side::Left),
            right_arm: ArmRig::new(Side::Right),
        }
    }

    pub fn arm(&self, side: Side) -> &ArmRig {
        match side {
            Side::Left => &self.left_arm,
            Side::Right => &self.right_arm,
        }
    }
}
