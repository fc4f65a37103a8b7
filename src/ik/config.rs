//! Solver configuration records.
//!
//! Every record has a `Default` matching the stock avatar setup and consuming
//! `with_*` setters. With the `serde` feature each record deserializes from
//! partial documents, missing fields taking their default.

use bitflags::bitflags;

/// What the arm solver does when the hand target lies beyond the arm's reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OverExtendMode {
    /// Pull the hand back so it stays at the reach limit.
    #[default]
    LimitHandReach,
    /// Keep the elbow where the arm solve puts it; the forearm stretches.
    ExtendForearm,
    /// Put the elbow at forearm length from the hand; the upper arm stretches.
    ExtendUpperArm,
    /// Halfway between [`ExtendForearm`](Self::ExtendForearm) and
    /// [`ExtendUpperArm`](Self::ExtendUpperArm).
    ExtendArm,
}

bitflags! {
    /// Clavicle handling for a single arm solve pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ArmSolveOptions: u8 {
        /// Put the clavicle back to its rest local rotation before solving.
        const RESET_CLAVICLE = 1 << 0;
        /// Rotate the clavicle toward the elbow found by the previous pass.
        const SOLVE_CLAVICLE = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArmIkConfig {
    /// How much the clavicle follows the arm, 0 to 1.
    pub clavicle_deformation: f32,
    /// Max deviation of the clavicle from rest, degrees.
    pub clavicle_range_of_motion: f32,
    /// Max deviation of the upper arm from its neutral direction, degrees.
    pub arm_range_of_motion: f32,
    /// Elbow aperture with no wrist torsion. 0 puts the elbow down, 1 out to the side.
    pub relaxed_elbow_aperture: f32,
    /// How much wrist torsion opens or closes the elbow.
    pub elbow_aperture_rotation: f32,
    pub over_extend_mode: OverExtendMode,
    /// Smooth the aperture and clavicle over time instead of snapping.
    pub smooth: bool,
}

impl Default for ArmIkConfig {
    fn default() -> Self {
        Self {
            clavicle_deformation: 0.37,
            clavicle_range_of_motion: 30.0,
            arm_range_of_motion: 100.0,
            relaxed_elbow_aperture: 0.5,
            elbow_aperture_rotation: 0.3,
            over_extend_mode: OverExtendMode::LimitHandReach,
            smooth: true,
        }
    }
}

impl ArmIkConfig {
    pub fn with_clavicle_deformation(mut self, weight: f32) -> Self {
        self.clavicle_deformation = weight.clamp(0.0, 1.0);
        self
    }

    pub fn with_clavicle_range_of_motion(mut self, degrees: f32) -> Self {
        self.clavicle_range_of_motion = degrees.max(0.0);
        self
    }

    pub fn with_arm_range_of_motion(mut self, degrees: f32) -> Self {
        self.arm_range_of_motion = degrees.max(0.0);
        self
    }

    pub fn with_relaxed_elbow_aperture(mut self, aperture: f32) -> Self {
        self.relaxed_elbow_aperture = aperture.clamp(0.0, 1.0);
        self
    }

    pub fn with_elbow_aperture_rotation(mut self, weight: f32) -> Self {
        self.elbow_aperture_rotation = weight.clamp(0.0, 1.0);
        self
    }

    pub fn with_over_extend_mode(mut self, mode: OverExtendMode) -> Self {
        self.over_extend_mode = mode;
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }
}

/// Window the unwrapped wrist torsion must stay in, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WristTorsionLimits {
    pub min_angle: f32,
    pub max_angle: f32,
}

impl Default for WristTorsionLimits {
    fn default() -> Self {
        Self {
            min_angle: -200.0,
            max_angle: 300.0,
        }
    }
}

impl WristTorsionLimits {
    pub fn new(min_angle: f32, max_angle: f32) -> Self {
        Self {
            min_angle: min_angle.min(max_angle),
            max_angle: max_angle.max(min_angle),
        }
    }

    pub fn contains(&self, angle: f32) -> bool {
        angle >= self.min_angle && angle <= self.max_angle
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BodyIkSettings {
    /// Keep the body pivot rotation fixed instead of following the head.
    pub lock_body_pivot: bool,
    /// Fraction of the remaining heading error the pivot corrects per second.
    pub body_pivot_rotation_speed: f32,
    /// Head pitch absorbed by the neck and head alone, degrees.
    pub head_free_range_bend: f32,
    /// Head yaw absorbed by the neck and head alone, degrees.
    pub head_free_range_torsion: f32,
    /// Share of the head rotation taken by the neck.
    pub neck_head_balance: f32,
    pub spine_bend: f32,
    pub spine_torsion: f32,
    pub chest_bend: f32,
    pub chest_torsion: f32,
    pub upper_chest_bend: f32,
    pub upper_chest_torsion: f32,
    /// Eyes above the head bone at bind time, avatar space.
    pub eyes_base_height: f32,
    /// Eyes in front of the head bone at bind time, avatar space.
    pub eyes_forward_offset: f32,
    /// Avatar speed above which the forward target straightens toward the view.
    pub move_speed_threshold: f32,
    /// Straightening per meter travelled.
    pub straighten_factor: f32,
    /// Share of the arm-driven torsion applied to the torso.
    pub arm_torsion_influence: f32,
}

impl Default for BodyIkSettings {
    fn default() -> Self {
        Self {
            lock_body_pivot: false,
            body_pivot_rotation_speed: 2.0,
            head_free_range_bend: 20.0,
            head_free_range_torsion: 30.0,
            neck_head_balance: 0.5,
            spine_bend: 0.05,
            spine_torsion: 0.4,
            chest_bend: 0.3,
            chest_torsion: 0.3,
            upper_chest_bend: 0.4,
            upper_chest_torsion: 0.3,
            eyes_base_height: 0.1,
            eyes_forward_offset: 0.1,
            move_speed_threshold: 0.1,
            straighten_factor: 1.0,
            arm_torsion_influence: 0.25,
        }
    }
}

impl BodyIkSettings {
    pub fn with_lock_body_pivot(mut self, lock: bool) -> Self {
        self.lock_body_pivot = lock;
        self
    }

    pub fn with_body_pivot_rotation_speed(mut self, speed: f32) -> Self {
        self.body_pivot_rotation_speed = speed.max(0.0);
        self
    }

    pub fn with_head_free_range(mut self, bend: f32, torsion: f32) -> Self {
        self.head_free_range_bend = bend.max(0.0);
        self.head_free_range_torsion = torsion.max(0.0);
        self
    }

    pub fn with_neck_head_balance(mut self, balance: f32) -> Self {
        self.neck_head_balance = balance.clamp(0.0, 1.0);
        self
    }

    pub fn with_spine(mut self, bend: f32, torsion: f32) -> Self {
        self.spine_bend = bend.max(0.0);
        self.spine_torsion = torsion.max(0.0);
        self
    }

    pub fn with_chest(mut self, bend: f32, torsion: f32) -> Self {
        self.chest_bend = bend.max(0.0);
        self.chest_torsion = torsion.max(0.0);
        self
    }

    pub fn with_upper_chest(mut self, bend: f32, torsion: f32) -> Self {
        self.upper_chest_bend = bend.max(0.0);
        self.upper_chest_torsion = torsion.max(0.0);
        self
    }

    pub fn with_eyes_offset(mut self, height: f32, forward: f32) -> Self {
        self.eyes_base_height = height;
        self.eyes_forward_offset = forward;
        self
    }

    pub fn with_arm_torsion_influence(mut self, influence: f32) -> Self {
        self.arm_torsion_influence = influence.clamp(0.0, 1.0);
        self
    }

    /// Bend fractions for spine, chest and upper chest, scaled down when they sum past 1.
    pub fn bend_fractions(&self) -> [f32; 3] {
        normalized([self.spine_bend, self.chest_bend, self.upper_chest_bend])
    }

    /// Torsion fractions for spine, chest and upper chest, scaled down when they sum past 1.
    pub fn torsion_fractions(&self) -> [f32; 3] {
        normalized([self.spine_torsion, self.chest_torsion, self.upper_chest_torsion])
    }
}

fn normalized(fractions: [f32; 3]) -> [f32; 3] {
    let total: f32 = fractions.iter().sum();
    let scale = 1.0 / total.max(1.0);
    fractions.map(|f| f * scale)
}

/// Everything [`AvatarIk`](super::AvatarIk) needs besides the rig.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AvatarIkConfig {
    pub left_arm: ArmIkConfig,
    pub right_arm: ArmIkConfig,
    pub wrist_torsion: WristTorsionLimits,
    pub body: BodyIkSettings,
}

impl AvatarIkConfig {
    /// Same arm configuration on both sides.
    pub fn with_arms(mut self, arm: ArmIkConfig) -> Self {
        self.left_arm = arm;
        self.right_arm = arm;
        self
    }

    pub fn with_wrist_torsion(mut self, limits: WristTorsionLimits) -> Self {
        self.wrist_torsion = limits;
        self
    }

    pub fn with_body(mut self, body: BodyIkSettings) -> Self {
        self.body = body;
        self
    }
}
