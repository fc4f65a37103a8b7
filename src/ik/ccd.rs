use glam::{Quat, Vec3};

use crate::error::RigError;
use crate::math::{normalize_angle, project_on_plane, signed_angle, twist_angle, Transform};
use crate::skeleton::{BoneId, Skeleton, SkeletonPose};

/// A pass whose largest applied rotation stays below this (degrees) made no progress.
const STALL_DEGREES: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CcdConstraint {
    #[default]
    SingleAxis,
    TwoAxes,
}

/// Inclusive angle range, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngleLimits {
    pub min: f32,
    pub max: f32,
}

impl AngleLimits {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.min, self.max)
    }
}

/// One rotating bone of a CCD chain.
///
/// Rotation axes are in the bone's own local space at rest.
#[derive(Debug, Clone, PartialEq)]
pub struct CcdLink {
    pub bone: BoneId,
    /// Fraction of the desired rotation applied per step.
    pub weight: f32,
    pub constraint: CcdConstraint,
    pub rotation_axis1: Vec3,
    pub rotation_axis2: Vec3,
    pub axis1_limits: Option<AngleLimits>,
    pub axis2_limits: Option<AngleLimits>,
    /// Rotate to match the goal's orientation around the axis instead of its position.
    pub align_to_goal: bool,
}

impl CcdLink {
    pub fn new(bone: BoneId, rotation_axis: Vec3) -> Self {
        Self {
            bone,
            weight: 1.0,
            constraint: CcdConstraint::SingleAxis,
            rotation_axis1: rotation_axis,
            rotation_axis2: Vec3::ZERO,
            axis1_limits: None,
            axis2_limits: None,
            align_to_goal: false,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }

    /// Makes the link rotate around a second axis, solved after the first.
    pub fn with_second_axis(mut self, rotation_axis: Vec3) -> Self {
        self.constraint = CcdConstraint::TwoAxes;
        self.rotation_axis2 = rotation_axis;
        self
    }

    pub fn with_axis1_limits(mut self, min: f32, max: f32) -> Self {
        self.axis1_limits = Some(AngleLimits::new(min, max));
        self
    }

    pub fn with_axis2_limits(mut self, min: f32, max: f32) -> Self {
        self.axis2_limits = Some(AngleLimits::new(min, max));
        self
    }

    pub fn with_align_to_goal(mut self, align: bool) -> Self {
        self.align_to_goal = align;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcdSolveResult {
    /// The effector is within the minimum distance of the goal.
    GoalReached,
    /// Iterations ran out while still making progress.
    ReachingGoal,
    /// A full pass over the chain rotated nothing.
    Error,
}

/// State captured at bind time plus the current accumulated angles.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinkState {
    initial_local_rotation: Quat,
    parent_axis1: Vec3,
    parent_axis2: Vec3,
    local_zero1: Vec3,
    local_zero2: Vec3,
    angle1: f32,
    angle2: f32,
}

impl LinkState {
    fn capture(link: &CcdLink, initial_local_rotation: Quat) -> Self {
        let axis1 = link.rotation_axis1.normalize_or_zero();
        let axis2 = link.rotation_axis2.normalize_or_zero();

        let (local_zero1, local_zero2) = match link.constraint {
            CcdConstraint::TwoAxes => (
                project_on_plane(axis2, axis1)
                    .try_normalize()
                    .unwrap_or_else(|| axis1.any_orthonormal_vector()),
                project_on_plane(axis1, axis2)
                    .try_normalize()
                    .unwrap_or_else(|| axis2.any_orthonormal_vector()),
            ),
            CcdConstraint::SingleAxis => (axis1.any_orthonormal_vector(), Vec3::ZERO),
        };

        Self {
            initial_local_rotation,
            parent_axis1: initial_local_rotation * axis1,
            parent_axis2: initial_local_rotation * axis2,
            local_zero1,
            local_zero2,
            angle1: 0.0,
            angle2: 0.0,
        }
    }

    fn rotation1(&self, angle: f32) -> Quat {
        Quat::from_axis_angle(self.parent_axis1, angle.to_radians())
    }

    fn rotation2(&self, angle: f32) -> Quat {
        if self.parent_axis2 == Vec3::ZERO {
            return Quat::IDENTITY;
        }
        Quat::from_axis_angle(self.parent_axis2, angle.to_radians())
    }

    fn local_rotation(&self, angle1: f32, angle2: f32) -> Quat {
        (self.rotation1(angle1) * self.rotation2(angle2) * self.initial_local_rotation).normalize()
    }

    /// Reads both angles back from the bone's current local rotation.
    fn measure(&self, local: Quat) -> (f32, f32) {
        let rest1 = self.initial_local_rotation * self.local_zero1;
        let angle1 = signed_angle(
            project_on_plane(rest1, self.parent_axis1),
            project_on_plane(local * self.local_zero1, self.parent_axis1),
            self.parent_axis1,
        );

        if self.parent_axis2 == Vec3::ZERO {
            return (angle1, 0.0);
        }

        let without_axis1 = self.rotation1(angle1).inverse() * local;
        let rest2 = self.initial_local_rotation * self.local_zero2;
        let angle2 = signed_angle(
            project_on_plane(rest2, self.parent_axis2),
            project_on_plane(without_axis1 * self.local_zero2, self.parent_axis2),
            self.parent_axis2,
        );
        (angle1, angle2)
    }
}

/// Cyclic coordinate descent over a chain of constrained links.
///
/// Each iteration walks the links from the base toward the effector end and
/// turns every link so the effector swings toward the goal. Link rotations are
/// always rebuilt from the captured rest rotation plus the clamped angles, so
/// error never accumulates.
#[derive(Debug, Clone)]
pub struct CcdSolver {
    links: Vec<CcdLink>,
    states: Vec<LinkState>,
    effector: BoneId,
    max_iterations: u32,
    min_distance: f32,
    constrain_goal_to_effector: bool,
}

impl CcdSolver {
    pub fn builder() -> CcdSolverBuilder {
        CcdSolverBuilder::new()
    }

    pub fn links(&self) -> &[CcdLink] {
        &self.links
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn effector(&self) -> BoneId {
        self.effector
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    /// Current angles of a link around its first and second axes, degrees.
    pub fn link_angles(&self, index: usize) -> Option<(f32, f32)> {
        self.states.get(index).map(|s| (s.angle1, s.angle2))
    }

    /// Puts every link back to its captured rest rotation.
    pub fn reset(&mut self, skel: &mut Skeleton) {
        for (link, state) in self.links.iter().zip(self.states.iter_mut()) {
            state.angle1 = 0.0;
            state.angle2 = 0.0;
            skel.set_local_rotation(link.bone, state.initial_local_rotation);
        }
    }

    /// Runs up to `max_iterations` passes toward `goal`.
    ///
    /// When the goal is not reached and goal constraining is on, `goal.position`
    /// is moved onto the effector.
    pub fn solve(&mut self, skel: &mut Skeleton, goal: &mut Transform) -> CcdSolveResult {
        let result = self.iterate(skel, goal);

        if result != CcdSolveResult::GoalReached && self.constrain_goal_to_effector {
            goal.position = skel.position(self.effector);
        }

        log::trace!(
            "ccd {:?}: effector {:.4} from goal",
            result,
            skel.position(self.effector).distance(goal.position)
        );
        result
    }

    fn iterate(&mut self, skel: &mut Skeleton, goal: &Transform) -> CcdSolveResult {
        for _ in 0..self.max_iterations {
            let mut max_applied = 0.0f32;

            for index in 0..self.links.len() {
                if self.goal_reached(skel, goal) {
                    return CcdSolveResult::GoalReached;
                }
                max_applied = max_applied.max(self.solve_link(skel, index, goal));
            }

            if max_applied < STALL_DEGREES {
                return if self.goal_reached(skel, goal) {
                    CcdSolveResult::GoalReached
                } else {
                    CcdSolveResult::Error
                };
            }
        }

        if self.goal_reached(skel, goal) {
            CcdSolveResult::GoalReached
        } else {
            CcdSolveResult::ReachingGoal
        }
    }

    fn goal_reached(&self, skel: &Skeleton, goal: &Transform) -> bool {
        skel.position(self.effector).distance(goal.position) <= self.min_distance
    }

    /// Solves one link, axis 1 then axis 2. Returns the largest rotation applied, degrees.
    fn solve_link(&mut self, skel: &mut Skeleton, index: usize, goal: &Transform) -> f32 {
        let link = &self.links[index];
        let state = &mut self.states[index];
        let parent_rotation = skel.parent_transform(link.bone).rotation;

        let (angle1, angle2) = state.measure(skel.local_rotation(link.bone));

        let world_axis1 = (parent_rotation * state.parent_axis1).normalize_or_zero();
        let delta1 = desired_angle(skel, link, self.effector, world_axis1, goal);
        let new_angle1 = clamp_angle(normalize_angle(angle1 + delta1), link.axis1_limits);
        skel.set_local_rotation(link.bone, state.local_rotation(new_angle1, angle2));
        state.angle1 = new_angle1;
        state.angle2 = angle2;
        let mut applied = normalize_angle(new_angle1 - angle1).abs();

        if link.constraint == CcdConstraint::TwoAxes {
            let world_axis2 =
                (parent_rotation * state.rotation1(new_angle1) * state.parent_axis2).normalize_or_zero();
            let delta2 = desired_angle(skel, link, self.effector, world_axis2, goal);
            let new_angle2 = clamp_angle(normalize_angle(angle2 + delta2), link.axis2_limits);
            skel.set_local_rotation(link.bone, state.local_rotation(new_angle1, new_angle2));
            state.angle2 = new_angle2;
            applied = applied.max(normalize_angle(new_angle2 - angle2).abs());
        }

        applied
    }
}

/// Weighted rotation around `world_axis` that brings the effector toward the goal, degrees.
fn desired_angle(
    skel: &Skeleton,
    link: &CcdLink,
    effector: BoneId,
    world_axis: Vec3,
    goal: &Transform,
) -> f32 {
    if world_axis == Vec3::ZERO {
        return 0.0;
    }

    let angle = if link.align_to_goal {
        let to_goal = goal.rotation * skel.rotation(effector).inverse();
        twist_angle(to_goal, world_axis)
    } else {
        let pivot = skel.position(link.bone);
        let to_effector = project_on_plane(skel.position(effector) - pivot, world_axis);
        let to_goal = project_on_plane(goal.position - pivot, world_axis);
        signed_angle(to_effector, to_goal, world_axis)
    };
    angle * link.weight
}

fn clamp_angle(angle: f32, limits: Option<AngleLimits>) -> f32 {
    match limits {
        Some(limits) => limits.clamp(angle),
        None => angle,
    }
}

pub struct CcdSolverBuilder {
    links: Vec<CcdLink>,
    effector: Option<BoneId>,
    max_iterations: u32,
    min_distance: f32,
    constrain_goal_to_effector: bool,
}

impl CcdSolverBuilder {
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            effector: None,
            max_iterations: 10,
            min_distance: 0.001,
            constrain_goal_to_effector: false,
        }
    }

    /// Appends a link. Links are listed from the base toward the effector.
    pub fn link(mut self, link: CcdLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn effector(mut self, bone: BoneId) -> Self {
        self.effector = Some(bone);
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn min_distance(mut self, min_distance: f32) -> Self {
        self.min_distance = min_distance.max(0.0);
        self
    }

    pub fn constrain_goal_to_effector(mut self, constrain: bool) -> Self {
        self.constrain_goal_to_effector = constrain;
        self
    }

    /// Validates the chain and captures rest rotations from the skeleton's current pose.
    pub fn build(self, skel: &Skeleton) -> Result<CcdSolver, RigError> {
        if self.links.is_empty() {
            return Err(RigError::EmptyChain);
        }
        let effector = self.effector.ok_or(RigError::MissingEffector)?;
        if !skel.contains(effector) {
            return Err(RigError::UnknownBone {
                role: "ccd effector",
                bone: effector,
            });
        }

        let mut states = Vec::with_capacity(self.links.len());
        for (index, link) in self.links.iter().enumerate() {
            if !skel.contains(link.bone) {
                return Err(RigError::UnknownBone {
                    role: "ccd link",
                    bone: link.bone,
                });
            }
            let second_axis_missing = link.constraint == CcdConstraint::TwoAxes
                && link.rotation_axis2.length_squared() < 1e-12;
            if link.rotation_axis1.length_squared() < 1e-12 || second_axis_missing {
                return Err(RigError::InvalidAxis { link: index });
            }
            states.push(LinkState::capture(link, skel.local_rotation(link.bone)));
        }

        log::debug!(
            "ccd chain: {} links, {} iterations, min distance {}",
            self.links.len(),
            self.max_iterations,
            self.min_distance
        );

        Ok(CcdSolver {
            links: self.links,
            states,
            effector,
            max_iterations: self.max_iterations,
            min_distance: self.min_distance,
            constrain_goal_to_effector: self.constrain_goal_to_effector,
        })
    }
}

impl Default for CcdSolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const STRAIGHT: Vec3 = Vec3::new(2.0, 0.0, 0.0);
    const BENT: Vec3 = Vec3::new(1.0, 1.0, 0.0);

    struct Planar {
        skel: Skeleton,
        links: [BoneId; 2],
        effector: BoneId,
    }

    /// Two unit links in the XY plane, base at the origin, mid joint at +X.
    fn planar_chain(tip: Vec3) -> Planar {
        let mut skel = Skeleton::new();
        let base = skel.add_bone_world("base", None, Vec3::ZERO, Quat::IDENTITY);
        let mid = skel.add_bone_world("mid", Some(base), Vec3::X, Quat::IDENTITY);
        let tip = skel.add_bone_world("tip", Some(mid), tip, Quat::IDENTITY);
        Planar {
            skel,
            links: [base, mid],
            effector: tip,
        }
    }

    fn solver(chain: &Planar, base_limits: Option<(f32, f32)>) -> CcdSolver {
        let mut base = CcdLink::new(chain.links[0], Vec3::Z);
        if let Some((min, max)) = base_limits {
            base = base.with_axis1_limits(min, max);
        }
        CcdSolver::builder()
            .link(base)
            .link(CcdLink::new(chain.links[1], Vec3::Z))
            .effector(chain.effector)
            .max_iterations(10)
            .min_distance(0.001)
            .build(&chain.skel)
            .unwrap()
    }

    #[test]
    fn reaches_goal_in_the_plane() {
        for target in [
            Vec3::new(1.2, 0.8, 0.0),
            Vec3::new(-0.5, 1.0, 0.0),
            Vec3::new(0.3, 1.3, 0.0),
        ] {
            let mut chain = planar_chain(BENT);
            let mut ccd = solver(&chain, None);
            let mut goal = Transform::from_position(target);

            let result = ccd.solve(&mut chain.skel, &mut goal);

            assert_eq!(result, CcdSolveResult::GoalReached, "goal {target}");
            assert!(chain.skel.position(chain.effector).distance(target) <= 0.001);
        }
    }

    #[test]
    fn limited_link_stays_within_limits() {
        let mut chain = planar_chain(BENT);
        let mut ccd = solver(&chain, Some((-45.0, 45.0)));
        let mut goal = Transform::from_position(Vec3::new(-1.2, 0.6, 0.0));

        let result = ccd.solve(&mut chain.skel, &mut goal);

        let (angle1, _) = ccd.link_angles(0).unwrap();
        assert!((-45.0..=45.0).contains(&angle1), "angle {angle1}");
        assert_ne!(result, CcdSolveResult::GoalReached);
    }

    #[test]
    fn sweep_starts_at_the_base() {
        let mut chain = planar_chain(STRAIGHT);
        let mut ccd = CcdSolver::builder()
            .link(CcdLink::new(chain.links[0], Vec3::Z))
            .link(CcdLink::new(chain.links[1], Vec3::Z))
            .effector(chain.effector)
            .max_iterations(1)
            .build(&chain.skel)
            .unwrap();
        let mut goal = Transform::from_position(Vec3::new(0.0, 2.0, 0.0));

        let result = ccd.solve(&mut chain.skel, &mut goal);

        // Swinging the base alone lands the effector, so the mid link never moves.
        assert_eq!(result, CcdSolveResult::GoalReached);
        let (base_angle, _) = ccd.link_angles(0).unwrap();
        assert_abs_diff_eq!(base_angle, 90.0, epsilon = 1e-3);
        assert_eq!(ccd.link_angles(1), Some((0.0, 0.0)));
    }

    #[test]
    fn straight_chain_toward_unreachable_goal_stalls() {
        let mut chain = planar_chain(STRAIGHT);
        let mut ccd = CcdSolver::builder()
            .link(CcdLink::new(chain.links[0], Vec3::Z))
            .link(CcdLink::new(chain.links[1], Vec3::Z))
            .effector(chain.effector)
            .constrain_goal_to_effector(true)
            .build(&chain.skel)
            .unwrap();
        let mut goal = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));

        let result = ccd.solve(&mut chain.skel, &mut goal);

        assert_eq!(result, CcdSolveResult::Error);
        assert_abs_diff_eq!(goal.position, Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn two_axis_link_reaches_off_plane_goal() {
        let mut skel = Skeleton::new();
        let base = skel.add_bone_world("base", None, Vec3::ZERO, Quat::IDENTITY);
        let tip = skel.add_bone_world("tip", Some(base), Vec3::X, Quat::IDENTITY);
        let mut ccd = CcdSolver::builder()
            .link(CcdLink::new(base, Vec3::Z).with_second_axis(Vec3::Y))
            .effector(tip)
            .max_iterations(20)
            .build(&skel)
            .unwrap();
        let mut goal = Transform::from_position(Vec3::new(0.0, 0.6, 0.8));

        let result = ccd.solve(&mut skel, &mut goal);

        assert_eq!(result, CcdSolveResult::GoalReached);
        let (angle1, angle2) = ccd.link_angles(0).unwrap();
        assert_abs_diff_eq!(angle1, 90.0, epsilon = 0.2);
        assert_abs_diff_eq!(angle2, -53.13, epsilon = 0.2);
    }

    #[test]
    fn align_to_goal_matches_orientation() {
        let mut skel = Skeleton::new();
        let base = skel.add_bone_world("base", None, Vec3::ZERO, Quat::IDENTITY);
        let tip = skel.add_bone_world("tip", Some(base), Vec3::X, Quat::IDENTITY);
        let mut ccd = CcdSolver::builder()
            .link(CcdLink::new(base, Vec3::Z).with_align_to_goal(true))
            .effector(tip)
            .build(&skel)
            .unwrap();
        let turn = Quat::from_rotation_z(30f32.to_radians());
        let mut goal = Transform::new(turn * Vec3::X, turn);

        let result = ccd.solve(&mut skel, &mut goal);

        assert_eq!(result, CcdSolveResult::GoalReached);
        assert!(skel.rotation(tip).abs_diff_eq(turn, 1e-4));
    }

    #[test]
    fn reset_restores_rest_pose() {
        let mut chain = planar_chain(STRAIGHT);
        let mut ccd = solver(&chain, None);
        let mut goal = Transform::from_position(Vec3::new(1.0, 1.0, 0.0));
        ccd.solve(&mut chain.skel, &mut goal);

        ccd.reset(&mut chain.skel);

        assert_abs_diff_eq!(chain.skel.position(chain.effector), Vec3::X * 2.0, epsilon = 1e-5);
        assert_eq!(ccd.link_angles(1), Some((0.0, 0.0)));
    }

    #[test]
    fn builder_keeps_chain_order_and_settings() {
        let chain = planar_chain(STRAIGHT);
        let ccd = solver(&chain, None);

        assert_eq!(ccd.link_count(), 2);
        assert_eq!(ccd.links()[1].bone, chain.links[1]);
        assert_eq!(ccd.effector(), chain.effector);
        assert_eq!(ccd.max_iterations(), 10);
        assert_eq!(ccd.min_distance(), 0.001);
    }

    #[test]
    fn builder_rejects_bad_chains() {
        let chain = planar_chain(STRAIGHT);

        let empty = CcdSolver::builder().effector(chain.effector).build(&chain.skel);
        assert_eq!(empty.unwrap_err(), RigError::EmptyChain);

        let no_effector = CcdSolver::builder()
            .link(CcdLink::new(chain.links[0], Vec3::Z))
            .build(&chain.skel);
        assert_eq!(no_effector.unwrap_err(), RigError::MissingEffector);

        let zero_axis = CcdSolver::builder()
            .link(CcdLink::new(chain.links[0], Vec3::Z))
            .link(CcdLink::new(chain.links[1], Vec3::ZERO))
            .effector(chain.effector)
            .build(&chain.skel);
        assert_eq!(zero_axis.unwrap_err(), RigError::InvalidAxis { link: 1 });
    }
}
