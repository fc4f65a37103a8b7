use glam::{Quat, Vec3};

use super::config::{ArmIkConfig, ArmSolveOptions, OverExtendMode, WristTorsionLimits};
use super::constraint::ConeLimit;
use super::torsion::WristTorsion;
use crate::dynamics::smooth_damp;
use crate::math::{angle, look_rotation, project_on_plane, rotate_towards, Transform};
use crate::rig::{ArmInfo, Side};
use crate::skeleton::{BoneId, Skeleton, SkeletonPose};

/// Hands closer than this to the reach limit count as over-extended.
pub const SAFE_DISTANCE: f32 = 0.001;
/// Below this shoulder-to-hand distance the elbow is left where it was.
pub const MIN_DISTANCE: f32 = 0.04;
/// Arms straighter than this use the avatar up as the elbow axis, degrees.
pub const ELBOW_AXIS_FALLBACK_ANGLE: f32 = 3.0;
pub const ELBOW_APERTURE_SMOOTH_TIME: f32 = 0.1;
pub const CLAVICLE_MAX_DEGREES_PER_SECOND: f32 = 360.0;
/// Forward swing of the neutral arm direction away from straight out, degrees.
pub const ARM_NEUTRAL_OFFSET: f32 = 30.0;

/// Per-frame inputs the arm cannot read from its own bones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmSolveContext {
    /// Shoulder of the opposite arm, used to tell outward from inward.
    pub other_shoulder: Option<Vec3>,
    pub avatar_up: Vec3,
    pub avatar_forward: Vec3,
    pub delta_time: f32,
}

impl ArmSolveContext {
    pub fn new(avatar_rotation: Quat, delta_time: f32) -> Self {
        Self {
            other_shoulder: None,
            avatar_up: avatar_rotation * Vec3::Y,
            avatar_forward: avatar_rotation * Vec3::Z,
            delta_time,
        }
    }

    pub fn with_other_shoulder(mut self, position: Vec3) -> Self {
        self.other_shoulder = Some(position);
        self
    }

    fn avatar_right(&self) -> Vec3 {
        self.avatar_up.cross(self.avatar_forward).normalize_or_zero()
    }
}

/// Smoothed elbow aperture. Negative means not initialized yet.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ElbowAperture {
    value: f32,
    velocity: f32,
}

impl ElbowAperture {
    const UNINITIALIZED: f32 = -1.0;

    fn new() -> Self {
        Self {
            value: Self::UNINITIALIZED,
            velocity: 0.0,
        }
    }

    fn update(&mut self, target: f32, smooth: bool, delta_time: f32) -> f32 {
        if self.value < 0.0 || !smooth {
            self.value = target;
            self.velocity = 0.0;
        } else {
            self.value = smooth_damp(
                self.value,
                target,
                &mut self.velocity,
                ELBOW_APERTURE_SMOOTH_TIME,
                f32::INFINITY,
                delta_time,
            );
        }
        self.value
    }
}

/// Analytic two-bone solver for one arm, with optional clavicle.
///
/// The hand bone's world pose is the target: the caller writes it before
/// [`solve`](Self::solve), and the solver only ever pulls its position back
/// (with [`OverExtendMode::LimitHandReach`]), never its rotation.
#[derive(Debug, Clone)]
pub struct ArmIkSolver {
    info: ArmInfo,
    config: ArmIkConfig,
    torsion: WristTorsion,
    aperture: ElbowAperture,
    /// Smoothed clavicle local rotation, `None` until the first clavicle solve.
    clavicle_local: Option<Quat>,
    last_elbow: Option<Vec3>,
    /// Neutral upper arm direction in the upper arm's parent space.
    neutral_local: Vec3,
    over_extended: bool,
}

impl ArmIkSolver {
    /// Binds to an arm in its rest pose. `avatar_rotation` gives the avatar's
    /// right and forward used to place the neutral arm direction.
    pub fn new(
        skel: &Skeleton,
        info: ArmInfo,
        config: ArmIkConfig,
        limits: WristTorsionLimits,
        avatar_rotation: Quat,
    ) -> Self {
        let outward = avatar_rotation * Vec3::X * info.side.sign();
        let forward = avatar_rotation * Vec3::Z;
        let offset = ARM_NEUTRAL_OFFSET.to_radians();
        let neutral_world = (outward * offset.cos() + forward * offset.sin()).normalize();
        let parent_rotation = skel.parent_transform(info.upper_arm.bone).rotation;

        log::debug!(
            "{:?} arm solver: reach {:.3}, clavicle {}, {} twist bones",
            info.side,
            info.reach(),
            info.clavicle.is_some(),
            info.twists.len()
        );

        Self {
            neutral_local: parent_rotation.inverse() * neutral_world,
            info,
            config,
            torsion: WristTorsion::new(limits),
            aperture: ElbowAperture::new(),
            clavicle_local: None,
            last_elbow: None,
            over_extended: false,
        }
    }

    pub fn side(&self) -> Side {
        self.info.side
    }

    pub fn info(&self) -> &ArmInfo {
        &self.info
    }

    pub fn config(&self) -> &ArmIkConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ArmIkConfig) {
        self.config = config;
    }

    /// Unwrapped wrist torsion from the last solve, degrees.
    pub fn wrist_torsion(&self) -> f32 {
        self.torsion.angle()
    }

    /// Smoothed elbow aperture from the last solve, or `None` before the first.
    pub fn elbow_aperture(&self) -> Option<f32> {
        (self.aperture.value >= 0.0).then_some(self.aperture.value)
    }

    /// Whether the hand target was beyond reach in the last solve.
    pub fn over_extended(&self) -> bool {
        self.over_extended
    }

    /// Drops all smoothing state, as if freshly bound.
    pub fn reset(&mut self) {
        self.torsion.reset();
        self.aperture = ElbowAperture::new();
        self.clavicle_local = None;
        self.last_elbow = None;
        self.over_extended = false;
    }

    pub fn solve(&mut self, skel: &mut Skeleton, ctx: &ArmSolveContext) {
        let torsion = self.measure_torsion(skel, ctx);

        let target = (self.config.relaxed_elbow_aperture
            + self.config.elbow_aperture_rotation * torsion / 180.0 * self.info.side.sign())
        .clamp(0.0, 1.0);
        self.aperture.update(target, self.config.smooth, ctx.delta_time);

        if self.info.clavicle.is_some() {
            self.solve_pass(
                skel,
                ctx,
                ArmSolveOptions::RESET_CLAVICLE,
                OverExtendMode::ExtendForearm,
            );
            self.solve_pass(
                skel,
                ctx,
                ArmSolveOptions::SOLVE_CLAVICLE,
                self.config.over_extend_mode,
            );
        } else {
            self.solve_pass(
                skel,
                ctx,
                ArmSolveOptions::empty(),
                self.config.over_extend_mode,
            );
        }

        self.distribute_twist(skel, torsion);
    }

    /// Wrist torsion against the forearm a solve at the relaxed aperture would
    /// leave, so it depends on this frame's hand target only. The arm is put back
    /// as it was afterwards.
    fn measure_torsion(&mut self, skel: &mut Skeleton, ctx: &ArmSolveContext) -> f32 {
        let bones: Vec<BoneId> = self
            .info
            .clavicle
            .iter()
            .chain([&self.info.upper_arm, &self.info.forearm, &self.info.hand])
            .map(|b| b.bone)
            .collect();
        let saved: Vec<Transform> = bones.iter().map(|&b| skel.local_transform(b)).collect();
        let (last_elbow, over_extended) = (self.last_elbow, self.over_extended);

        let options = if self.info.clavicle.is_some() {
            ArmSolveOptions::RESET_CLAVICLE
        } else {
            ArmSolveOptions::empty()
        };
        self.solve_arm(
            skel,
            ctx,
            options,
            OverExtendMode::ExtendForearm,
            self.config.relaxed_elbow_aperture,
        );
        let forearm_rotation = skel.rotation(self.info.forearm.bone);
        let hand_rotation = skel.rotation(self.info.hand.bone);

        for (&bone, &local) in bones.iter().zip(&saved) {
            skel.set_local_transform(bone, local);
        }
        self.last_elbow = last_elbow;
        self.over_extended = over_extended;

        self.torsion.update(
            forearm_rotation,
            &self.info.forearm.axes,
            hand_rotation,
            &self.info.hand.axes,
        )
    }

    /// One clavicle step followed by one two-bone solve.
    pub fn solve_pass(
        &mut self,
        skel: &mut Skeleton,
        ctx: &ArmSolveContext,
        options: ArmSolveOptions,
        over_extend_mode: OverExtendMode,
    ) {
        self.solve_arm(skel, ctx, options, over_extend_mode, self.aperture.value);
    }

    fn solve_arm(
        &mut self,
        skel: &mut Skeleton,
        ctx: &ArmSolveContext,
        options: ArmSolveOptions,
        over_extend_mode: OverExtendMode,
        aperture: f32,
    ) {
        let hand_target = skel.world_transform(self.info.hand.bone);

        self.solve_clavicle(skel, ctx, options);
        skel.set_world_transform(self.info.hand.bone, hand_target);

        let upper_arm = self.info.upper_arm;
        let forearm = self.info.forearm;
        let r1 = self.info.upper_arm_length;
        let r2 = self.info.forearm_length;

        let shoulder = skel.position(upper_arm.bone);
        let mut hand_pos = hand_target.position;
        let to_hand = hand_pos - shoulder;
        let distance = to_hand.length();

        self.over_extended = false;
        let mut elbow = if distance < MIN_DISTANCE {
            self.last_elbow.unwrap_or_else(|| skel.position(forearm.bone))
        } else {
            let dir = to_hand / distance;
            let max_reach = r1 + r2 - SAFE_DISTANCE;
            self.over_extended = distance > max_reach;
            if self.over_extended {
                log::trace!(
                    "{:?} hand {:.3} beyond reach {:.3}",
                    self.info.side,
                    distance,
                    max_reach
                );
                if over_extend_mode == OverExtendMode::LimitHandReach {
                    hand_pos = shoulder + dir * max_reach;
                }
            }
            let solve_distance = distance.min(max_reach);

            let center_distance = ((r1 * r1 - r2 * r2 + solve_distance * solve_distance)
                / (2.0 * solve_distance))
                .clamp(-r1, r1);
            let radius = (center_distance / r1).acos().sin() * r1;
            let center = shoulder + dir * center_distance;

            let elbow_dir = self.elbow_direction(dir, shoulder, ctx, aperture);
            let mut elbow = center + elbow_dir * radius;

            let neutral = skel.parent_transform(upper_arm.bone).rotation * self.neutral_local;
            let limit = ConeLimit::new(self.config.arm_range_of_motion);
            let arm_dir = elbow - shoulder;
            if !limit.contains(arm_dir, neutral) {
                elbow = shoulder + limit.apply(arm_dir, neutral) * r1;
            }
            elbow
        };

        if self.over_extended {
            let stretched = hand_pos - (hand_pos - elbow).normalize_or_zero() * r2;
            match over_extend_mode {
                OverExtendMode::ExtendUpperArm => elbow = stretched,
                OverExtendMode::ExtendArm => elbow = (stretched + elbow) * 0.5,
                OverExtendMode::LimitHandReach | OverExtendMode::ExtendForearm => {}
            }
        }

        let arm_forward = (elbow - shoulder).normalize_or_zero();
        let forearm_forward = (hand_pos - elbow).normalize_or_zero();
        let elbow_axis = if angle(arm_forward, forearm_forward) < ELBOW_AXIS_FALLBACK_ANGLE {
            ctx.avatar_up
        } else {
            let axis = forearm_forward.cross(arm_forward);
            match self.info.side {
                Side::Left => -axis,
                Side::Right => axis,
            }
        };

        if arm_forward != Vec3::ZERO {
            let rotation = upper_arm
                .axes
                .actual_rotation(look_rotation(arm_forward, elbow_axis));
            skel.set_rotation(upper_arm.bone, rotation);
        }
        skel.set_position(forearm.bone, elbow);
        if forearm_forward != Vec3::ZERO {
            let rotation = forearm
                .axes
                .actual_rotation(look_rotation(forearm_forward, elbow_axis));
            skel.set_rotation(forearm.bone, rotation);
        }
        skel.set_world_transform(
            self.info.hand.bone,
            Transform::new(hand_pos, hand_target.rotation),
        );

        self.last_elbow = Some(elbow);
    }

    fn solve_clavicle(&mut self, skel: &mut Skeleton, ctx: &ArmSolveContext, options: ArmSolveOptions) {
        let Some(clavicle) = self.info.clavicle else {
            return;
        };
        let rest_local = clavicle.axes.initial_local_rotation();

        if options.contains(ArmSolveOptions::RESET_CLAVICLE) {
            skel.set_local_rotation(clavicle.bone, rest_local);
        }
        if !options.contains(ArmSolveOptions::SOLVE_CLAVICLE) {
            return;
        }

        let parent_rotation = skel.parent_transform(clavicle.bone).rotation;
        let rest_world = parent_rotation * rest_local;
        let rest_forward = clavicle.axes.world_forward(rest_world);
        let to_elbow = skel.position(self.info.forearm.bone) - skel.position(clavicle.bone);

        let target_local = match to_elbow.try_normalize() {
            Some(to_elbow) => {
                let look = Quat::from_rotation_arc(rest_forward, to_elbow) * rest_world;
                let full = (parent_rotation.inverse() * look).normalize();
                let weighted = rest_local.slerp(full, self.config.clavicle_deformation);
                rotate_towards(rest_local, weighted, self.config.clavicle_range_of_motion)
            }
            None => rest_local,
        };

        let local = match self.clavicle_local {
            Some(previous) if self.config.smooth => rotate_towards(
                previous,
                target_local,
                CLAVICLE_MAX_DEGREES_PER_SECOND * ctx.delta_time.max(0.0),
            ),
            _ => target_local,
        };
        self.clavicle_local = Some(local);
        skel.set_local_rotation(clavicle.bone, local);
    }

    /// Elbow direction on the solve circle: between straight down and out to the
    /// side, by the current aperture.
    fn elbow_direction(&self, dir: Vec3, shoulder: Vec3, ctx: &ArmSolveContext, aperture: f32) -> Vec3 {
        let mut down = project_on_plane(-ctx.avatar_up, dir);
        if down.length_squared() < 1e-8 {
            down = project_on_plane(-ctx.avatar_forward, dir);
        }
        let down = down.try_normalize().unwrap_or_else(|| dir.any_orthonormal_vector());

        let outward = ctx
            .other_shoulder
            .and_then(|other| (shoulder - other).try_normalize())
            .unwrap_or_else(|| ctx.avatar_right() * self.info.side.sign());

        let mut side = dir.cross(down).normalize_or_zero();
        let facing = side.dot(outward);
        if facing < -1e-4 || (facing.abs() <= 1e-4 && side.dot(ctx.avatar_forward) > 0.0) {
            side = -side;
        }

        down.lerp(side, aperture.clamp(0.0, 1.0)).try_normalize().unwrap_or(down)
    }

    fn distribute_twist(&self, skel: &mut Skeleton, torsion: f32) {
        for (twist, axes) in &self.info.twists {
            let roll = Quat::from_axis_angle(axes.local_forward, (torsion * twist.fraction).to_radians());
            skel.set_local_rotation(twist.bone, axes.initial_local_rotation() * roll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::{AvatarRigInfo, HumanoidBuilder};
    use approx::assert_abs_diff_eq;

    fn right_arm(clavicles: bool, config: ArmIkConfig) -> (Skeleton, ArmIkSolver) {
        let humanoid = HumanoidBuilder::new().clavicles(clavicles).build();
        let info = AvatarRigInfo::compute(&humanoid.skeleton, &humanoid.rig).unwrap();
        let arm = info.right_arm.unwrap();
        let solver = ArmIkSolver::new(
            &humanoid.skeleton,
            arm,
            config,
            WristTorsionLimits::default(),
            Quat::IDENTITY,
        );
        (humanoid.skeleton, solver)
    }

    fn place_hand(skel: &mut Skeleton, solver: &ArmIkSolver, position: Vec3) {
        let hand = solver.info().hand.bone;
        let rotation = skel.rotation(hand);
        skel.set_world_transform(hand, Transform::new(position, rotation));
    }

    fn context() -> ArmSolveContext {
        ArmSolveContext::new(Quat::IDENTITY, 0.0).with_other_shoulder(Vec3::new(-0.18, 1.45, 0.0))
    }

    #[test]
    fn zero_aperture_drops_elbow_down() {
        let config = ArmIkConfig::default()
            .with_relaxed_elbow_aperture(0.0)
            .with_elbow_aperture_rotation(0.0)
            .with_arm_range_of_motion(180.0);
        let (mut skel, mut solver) = right_arm(false, config);
        let shoulder = skel.position(solver.info().upper_arm.bone);
        place_hand(&mut skel, &solver, shoulder + Vec3::new(0.2, 0.0, 0.3));

        solver.solve(&mut skel, &context());

        let elbow = skel.position(solver.info().forearm.bone);
        assert!(elbow.y < shoulder.y - 0.05, "elbow {elbow} not below shoulder {shoulder}");
    }

    #[test]
    fn full_aperture_swings_elbow_outward() {
        let config = ArmIkConfig::default()
            .with_relaxed_elbow_aperture(1.0)
            .with_elbow_aperture_rotation(0.0)
            .with_arm_range_of_motion(180.0);
        let (mut skel, mut solver) = right_arm(false, config);
        let shoulder = skel.position(solver.info().upper_arm.bone);
        place_hand(&mut skel, &solver, shoulder + Vec3::new(0.0, 0.0, 0.35));

        solver.solve(&mut skel, &context());

        let elbow = skel.position(solver.info().forearm.bone);
        assert!(elbow.x > shoulder.x + 0.1, "elbow {elbow} not outward of {shoulder}");
        assert_abs_diff_eq!(elbow.y, shoulder.y, epsilon = 1e-3);
    }

    #[test]
    fn range_of_motion_keeps_upper_arm_near_neutral() {
        let config = ArmIkConfig::default().with_arm_range_of_motion(40.0);
        let (mut skel, mut solver) = right_arm(false, config);
        let shoulder = skel.position(solver.info().upper_arm.bone);
        // Hand across the chest to the left pulls the arm far from neutral.
        place_hand(&mut skel, &solver, shoulder + Vec3::new(-0.3, -0.1, 0.1));

        solver.solve(&mut skel, &context());

        let elbow = skel.position(solver.info().forearm.bone);
        let offset = ARM_NEUTRAL_OFFSET.to_radians();
        let neutral = Vec3::new(offset.cos(), 0.0, offset.sin());
        assert!((elbow - shoulder).angle_between(neutral).to_degrees() <= 40.0 + 1e-2);
        assert_abs_diff_eq!(elbow.distance(shoulder), solver.info().upper_arm_length, epsilon = 1e-4);
    }

    #[test]
    fn hand_rotation_is_preserved() {
        let (mut skel, mut solver) = right_arm(true, ArmIkConfig::default());
        let hand = solver.info().hand.bone;
        let rotation = Quat::from_rotation_z(0.7) * Quat::from_rotation_x(0.3);
        skel.set_world_transform(hand, Transform::new(Vec3::new(0.4, 1.2, 0.3), rotation));

        solver.solve(&mut skel, &context());

        assert!(skel.rotation(hand).abs_diff_eq(rotation, 1e-4));
        assert_abs_diff_eq!(skel.position(hand), Vec3::new(0.4, 1.2, 0.3), epsilon = 1e-4);
    }

    #[test]
    fn clavicle_stays_within_its_range() {
        let config = ArmIkConfig::default()
            .with_clavicle_deformation(1.0)
            .with_clavicle_range_of_motion(15.0);
        let (mut skel, mut solver) = right_arm(true, config);
        let clavicle = solver.info().clavicle.unwrap();
        let rest = skel.local_rotation(clavicle.bone);
        place_hand(&mut skel, &solver, Vec3::new(0.3, 2.0, 0.0));

        solver.solve(&mut skel, &context());

        let moved = skel.local_rotation(clavicle.bone).angle_between(rest).to_degrees();
        assert!(moved > 1.0);
        assert!(moved <= 15.0 + 1e-2);
    }

    #[test]
    fn hand_at_shoulder_keeps_previous_elbow() {
        let (mut skel, mut solver) = right_arm(false, ArmIkConfig::default());
        let shoulder = skel.position(solver.info().upper_arm.bone);
        place_hand(&mut skel, &solver, shoulder + Vec3::new(0.2, -0.1, 0.25));
        solver.solve(&mut skel, &context());
        let elbow = skel.position(solver.info().forearm.bone);

        place_hand(&mut skel, &solver, shoulder + Vec3::new(0.01, 0.0, 0.01));
        solver.solve(&mut skel, &context());

        assert_abs_diff_eq!(skel.position(solver.info().forearm.bone), elbow, epsilon = 1e-4);
    }

    #[test]
    fn forearm_twist_follows_wrist_torsion() {
        let humanoid = HumanoidBuilder::new().forearm_twist(true).build();
        let info = AvatarRigInfo::compute(&humanoid.skeleton, &humanoid.rig).unwrap();
        let mut skel = humanoid.skeleton;
        let arm = info.right_arm.unwrap();
        let (twist, axes) = arm.twists[0];
        let mut solver = ArmIkSolver::new(
            &skel,
            arm,
            ArmIkConfig::default(),
            WristTorsionLimits::default(),
            Quat::IDENTITY,
        );
        let hand = solver.info().hand.bone;
        let position = skel.position(hand) - Vec3::X * 0.05;
        let rotation = Quat::from_rotation_x(60f32.to_radians()) * skel.rotation(hand);
        skel.set_world_transform(hand, Transform::new(position, rotation));

        solver.solve(&mut skel, &context());

        let roll = axes.initial_local_rotation().inverse() * skel.local_rotation(twist.bone);
        let expected = solver.wrist_torsion() * twist.fraction;
        assert!(solver.wrist_torsion().abs() > 1.0);
        assert_abs_diff_eq!(roll.angle_between(Quat::IDENTITY).to_degrees(), expected.abs(), epsilon = 1e-2);
    }

    #[test]
    fn reset_returns_aperture_to_sentinel() {
        let (mut skel, mut solver) = right_arm(false, ArmIkConfig::default());
        solver.solve(&mut skel, &context());
        assert!(solver.elbow_aperture().is_some());

        solver.reset();

        assert!(solver.elbow_aperture().is_none());
        assert_eq!(solver.wrist_torsion(), 0.0);
    }
}
