use glam::{Quat, Vec3};

use super::config::BodyIkSettings;
use crate::dynamics::SmoothDamped;
use crate::math::{angle, project_on_plane, signed_angle, slerp_direction, Transform};
use crate::rig::{BodyInfo, BoneAxes, Side};
use crate::skeleton::{BoneId, Skeleton, SkeletonPose};

/// Cameras closer than this to straight up or down keep the current forward target, degrees.
pub const CAMERA_VERTICAL_DEAD_ZONE: f32 = 15.0;
/// Candidate headings further than this from the current target are ignored, degrees.
pub const FORWARD_CANDIDATE_MAX_ANGLE: f32 = 90.0;
pub const TORSO_TORSION_SMOOTH_TIME: f32 = 0.1;

const FLAT_EPSILON: f32 = 1e-4;

/// Where an arm ended up after its solve, fed back into the torso.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmSample {
    pub side: Side,
    pub shoulder: Vec3,
    pub elbow: Vec3,
}

/// Upper-body posture driven by the head-mounted camera.
///
/// [`pre_solve`](Self::pre_solve) places the torso under the camera before the
/// arms solve, [`post_solve`](Self::post_solve) twists the torso after them
/// according to where the elbows went.
#[derive(Debug, Clone)]
pub struct BodyIk {
    root: BoneId,
    info: BodyInfo,
    settings: BodyIkSettings,
    /// Neck (or head) position relative to the eyes, in camera space.
    neck_offset: Vec3,
    forward_target: Option<Vec3>,
    last_root_position: Option<Vec3>,
    torso_torsion: [SmoothDamped<f32>; 3],
}

impl BodyIk {
    /// Binds to the rest pose, assuming the camera looks along the avatar's forward.
    pub fn new(skel: &Skeleton, root: BoneId, info: BodyInfo, settings: BodyIkSettings) -> Self {
        let avatar_rotation = skel.rotation(root);
        let head = skel.position(info.head.bone);
        let eyes = head
            + avatar_rotation * Vec3::Y * settings.eyes_base_height
            + avatar_rotation * Vec3::Z * settings.eyes_forward_offset;
        let anchor = info.neck.unwrap_or(info.head).bone;
        let neck_offset = avatar_rotation.inverse() * (skel.position(anchor) - eyes);

        log::debug!(
            "body ik: {} spine segments, neck offset {neck_offset}",
            info.segments().count()
        );

        Self {
            root,
            info,
            settings,
            neck_offset,
            forward_target: None,
            last_root_position: None,
            torso_torsion: [SmoothDamped::new(TORSO_TORSION_SMOOTH_TIME, 0.0); 3],
        }
    }

    pub fn info(&self) -> &BodyInfo {
        &self.info
    }

    pub fn settings(&self) -> &BodyIkSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: BodyIkSettings) {
        self.settings = settings;
    }

    /// Heading the body pivot is turning toward, `None` before the first pre-solve.
    pub fn forward_target(&self) -> Option<Vec3> {
        self.forward_target
    }

    /// Smoothed arm-driven torsion of spine, chest and upper chest, degrees.
    pub fn torso_torsion(&self) -> [f32; 3] {
        self.torso_torsion.map(|t| t.current())
    }

    pub fn reset(&mut self) {
        self.forward_target = None;
        self.last_root_position = None;
        for torsion in &mut self.torso_torsion {
            torsion.reset(0.0);
        }
    }

    pub fn pre_solve(&mut self, skel: &mut Skeleton, camera: &Transform, delta_time: f32) {
        let saved = self.push_independent(skel);

        for bone in self.posture_bones() {
            skel.set_local_rotation(bone.bone, bone.axes.initial_local_rotation());
        }

        let avatar_rotation = skel.rotation(self.root);
        let up = avatar_rotation * Vec3::Y;
        let pivot = self.info.pivot;

        let camera_forward = camera.forward();
        let view = flat_view_direction(camera, up);
        let pivot_forward = flatten(pivot.axes.world_forward(skel.rotation(pivot.bone)), up)
            .unwrap_or(avatar_rotation * Vec3::Z);

        let mut target = self.forward_target.unwrap_or(pivot_forward);
        if let Some(candidate) = view.filter(|_| !near_vertical(camera_forward, up)) {
            let offset = signed_angle(target, candidate, up);
            let free = self.settings.head_free_range_torsion;
            if offset.abs() < FORWARD_CANDIDATE_MAX_ANGLE && offset.abs() > free {
                let excess = offset - free * offset.signum();
                target = Quat::from_axis_angle(up, excess.to_radians()) * target;
            }

            let root_position = skel.position(self.root);
            if let Some(last) = self.last_root_position {
                let moved = project_on_plane(root_position - last, up).length();
                if delta_time > 0.0 && moved / delta_time > self.settings.move_speed_threshold {
                    let t = (moved * self.settings.straighten_factor).clamp(0.0, 1.0);
                    target = slerp_direction(target, candidate, t);
                }
            }
        }
        self.forward_target = Some(target);
        self.last_root_position = Some(skel.position(self.root));

        let mut pivot_forward = pivot_forward;
        if !self.settings.lock_body_pivot {
            let heading = signed_angle(pivot_forward, target, up);
            let step = heading
                * (self.settings.body_pivot_rotation_speed * delta_time.max(0.0)).clamp(0.0, 1.0);
            let turn = Quat::from_axis_angle(up, step.to_radians());
            skel.set_rotation(pivot.bone, (turn * skel.rotation(pivot.bone)).normalize());
            pivot_forward = turn * pivot_forward;
        }

        self.bend_torso(skel, camera_forward, view, pivot_forward, up);

        let anchor = self.info.neck.unwrap_or(self.info.head).bone;
        let desired = camera.transform_point(self.neck_offset);
        let correction = desired - skel.position(anchor);
        let pivot_position = skel.position(pivot.bone);
        skel.set_position(pivot.bone, pivot_position + correction);

        let head = self.info.head;
        let head_target = head.axes.actual_rotation(camera.rotation);
        if let Some(neck) = self.info.neck {
            let delta = head_target * skel.rotation(head.bone).inverse();
            let share = Quat::IDENTITY.slerp(delta, self.settings.neck_head_balance);
            skel.set_rotation(neck.bone, (share * skel.rotation(neck.bone)).normalize());
        }
        skel.set_rotation(head.bone, head_target);

        self.pop_independent(skel, &saved);
    }

    pub fn post_solve(&mut self, skel: &mut Skeleton, arms: &[ArmSample], delta_time: f32) {
        let saved = self.push_independent(skel);

        let up = skel.rotation(self.root) * Vec3::Y;
        let pivot = self.info.pivot;
        let right = pivot.axes.world_right(skel.rotation(pivot.bone));

        let torsion: f32 = arms
            .iter()
            .filter_map(|arm| {
                let reference = flatten(right * arm.side.sign(), up)?;
                let direction = flatten(arm.elbow - arm.shoulder, up)?;
                Some(signed_angle(reference, direction, up))
            })
            .sum();

        let fractions = self.settings.torsion_fractions();
        let influence = self.settings.arm_torsion_influence;
        let segments = [self.info.spine, self.info.chest, self.info.upper_chest];
        for ((segment, smoothed), fraction) in segments
            .iter()
            .zip(self.torso_torsion.iter_mut())
            .zip(fractions)
        {
            let value = smoothed.update(torsion * influence * fraction, delta_time);
            if let Some(segment) = segment {
                let twist = Quat::from_axis_angle(segment.axes.local_up, value.to_radians());
                let local = skel.local_rotation(segment.bone);
                skel.set_local_rotation(segment.bone, (local * twist).normalize());
            }
        }

        self.pop_independent(skel, &saved);
    }

    /// Spreads the head pitch and yaw beyond the free range over the spine segments.
    fn bend_torso(
        &self,
        skel: &mut Skeleton,
        camera_forward: Vec3,
        view: Option<Vec3>,
        pivot_forward: Vec3,
        up: Vec3,
    ) {
        let Some(view) = view else {
            return;
        };
        let right = up.cross(pivot_forward).normalize_or_zero();

        let yaw = signed_angle(pivot_forward, view, up);
        let pitch = signed_angle(view, camera_forward, right);
        let excess_yaw = excess(yaw, self.settings.head_free_range_torsion);
        let excess_pitch = excess(pitch, self.settings.head_free_range_bend);
        if excess_yaw == 0.0 && excess_pitch == 0.0 {
            return;
        }

        let bend = self.settings.bend_fractions();
        let torsion = self.settings.torsion_fractions();
        let segments = [self.info.spine, self.info.chest, self.info.upper_chest];
        for (i, segment) in segments.iter().enumerate() {
            let Some(segment) = segment else {
                continue;
            };
            let rotation = Quat::from_axis_angle(up, (excess_yaw * torsion[i]).to_radians())
                * Quat::from_axis_angle(right, (excess_pitch * bend[i]).to_radians());
            let world = skel.rotation(segment.bone);
            skel.set_rotation(segment.bone, (rotation * world).normalize());
        }
    }

    fn posture_bones(&self) -> impl Iterator<Item = BoneAxes> + '_ {
        [self.info.spine, self.info.chest, self.info.upper_chest, self.info.neck]
            .into_iter()
            .flatten()
            .chain(std::iter::once(self.info.head))
    }

    fn push_independent(&self, skel: &Skeleton) -> Vec<(BoneId, Transform)> {
        self.info
            .independent
            .iter()
            .map(|&bone| (bone, skel.world_transform(bone)))
            .collect()
    }

    fn pop_independent(&self, skel: &mut Skeleton, saved: &[(BoneId, Transform)]) {
        for &(bone, world) in saved {
            skel.set_world_transform(bone, world);
        }
    }
}

fn flatten(direction: Vec3, up: Vec3) -> Option<Vec3> {
    let flat = project_on_plane(direction, up);
    (flat.length() > FLAT_EPSILON).then(|| flat.normalize())
}

fn near_vertical(direction: Vec3, up: Vec3) -> bool {
    let from_up = angle(direction, up);
    from_up < CAMERA_VERTICAL_DEAD_ZONE || from_up > 180.0 - CAMERA_VERTICAL_DEAD_ZONE
}

/// Horizontal view heading. Looking straight up or down falls back to the camera's up vector.
fn flat_view_direction(camera: &Transform, up: Vec3) -> Option<Vec3> {
    let forward = camera.forward();
    flatten(forward, up).or_else(|| {
        let camera_up = camera.up();
        let sign = if forward.dot(up) > 0.0 { -1.0 } else { 1.0 };
        flatten(camera_up * sign, up)
    })
}

/// Part of `value` beyond `±free`, keeping its sign.
fn excess(value: f32, free: f32) -> f32 {
    let beyond = value.abs() - free;
    if beyond > 0.0 {
        beyond * value.signum()
    } else {
        0.0
    }
}
