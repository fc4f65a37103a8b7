use avatar_ik::ik::{AvatarIk, AvatarIkConfig, CcdLink, CcdSolver, FrameInput, OverExtendMode};
use avatar_ik::math::Transform;
use avatar_ik::rig::{HumanoidBuilder, Side};
use avatar_ik::skeleton::{BoneId, Skeleton, SkeletonPose};
use avatar_ik::RigError;
use glam::{Quat, Vec3};

const FRAME_TIME: f32 = 1.0 / 90.0;
const FRAMES: u32 = 360;

struct App {
    skeleton: Skeleton,
    ik: AvatarIk,
    tail: CcdSolver,
    tail_root: BoneId,
    time: f32,
}

impl App {
    fn new() -> Result<Self, RigError> {
        let humanoid = HumanoidBuilder::new().forearm_twist(true).build();
        let mut skeleton = humanoid.skeleton;
        let ik = AvatarIk::new(&skeleton, &humanoid.rig, &AvatarIkConfig::default())?;

        // A three-link tail hanging off the hips, solved independently of the avatar.
        let mut parent = humanoid.rig.body.pivot.unwrap_or(humanoid.rig.root);
        let mut links = Vec::new();
        for i in 0..4 {
            let position = Vec3::new(0.0, 0.95 - 0.2 * i as f32, -0.1);
            parent = skeleton.add_bone_world(format!("tail_{i}"), Some(parent), position, Quat::IDENTITY);
            links.push(parent);
        }
        let tail_root = links[0];
        let tail = links[..3]
            .iter()
            .fold(CcdSolver::builder(), |builder, &bone| {
                builder.link(
                    CcdLink::new(bone, Vec3::X)
                        .with_second_axis(Vec3::Z)
                        .with_axis1_limits(-60.0, 60.0)
                        .with_axis2_limits(-60.0, 60.0)
                        .with_weight(0.8),
                )
            })
            .effector(links[3])
            .max_iterations(10)
            .min_distance(0.005)
            .constrain_goal_to_effector(true)
            .build(&skeleton)?;
        log::info!(
            "tail: {} links to {:?}, {} iterations, {} m tolerance",
            tail.link_count(),
            tail.effector(),
            tail.max_iterations(),
            tail.min_distance()
        );

        Ok(Self {
            skeleton,
            ik,
            tail,
            tail_root,
            time: 0.0,
        })
    }

    fn update(&mut self) {
        self.time += FRAME_TIME;
        let t = self.time;

        let camera = Transform::new(
            Vec3::new(0.1 * (t * 0.7).sin(), 1.7, 0.1 + 0.05 * (t * 0.5).sin()),
            Quat::from_rotation_y((60.0 * (t * 0.4).sin()).to_radians()),
        );
        let left = Transform::new(
            Vec3::new(-0.3, 1.2 + 0.2 * (t * 1.3).sin(), 0.35),
            Quat::from_rotation_z(90f32.to_radians()),
        );
        let right = Transform::new(
            Vec3::new(0.35 + 0.4 * (t * 0.9).sin().max(0.0), 1.3, 0.3 + 0.3 * (t * 0.6).cos()),
            Quat::from_rotation_x((200.0 * (t * 0.3).sin()).to_radians()),
        );
        let frame = FrameInput::new(camera, FRAME_TIME).with_hands(left, right);
        self.ik.update(&mut self.skeleton, &frame);

        let tail_base = self.skeleton.position(self.tail_root);
        let mut goal = Transform::from_position(
            tail_base + Vec3::new(0.3 * (t * 2.0).sin(), -0.45, -0.25),
        );
        let result = self.tail.solve(&mut self.skeleton, &mut goal);

        log::debug!("t={t:.2}s tail {result:?}");
    }

    /// Second half of the run: body pivot locked, arms stretch instead of clamping.
    fn switch_settings(&mut self) {
        if let Some(body) = self.ik.body_mut() {
            let settings = body.settings().with_lock_body_pivot(true);
            body.set_settings(settings);
        }
        for side in [Side::Left, Side::Right] {
            if let Some(arm) = self.ik.arm_mut(side) {
                let config = arm.config().with_over_extend_mode(OverExtendMode::ExtendArm);
                arm.set_config(config);
            }
        }
        log::info!("switched to locked pivot and stretching arms");
    }

    fn report(&self) {
        for side in [Side::Left, Side::Right] {
            let Some(arm) = self.ik.arm(side) else {
                continue;
            };
            log::info!(
                "{side:?} arm: torsion {:.1}, aperture {:.2}, over-extended {}",
                arm.wrist_torsion(),
                arm.elbow_aperture().unwrap_or_default(),
                arm.over_extended()
            );
        }
        if let Some(body) = self.ik.body() {
            log::info!(
                "body: forward {:?}, torso torsion {:?}",
                body.forward_target(),
                body.torso_torsion()
            );
        }
    }
}

fn main() -> Result<(), RigError> {
    env_logger::init();

    let mut app = App::new()?;
    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            app.switch_settings();
        }
        app.update();
        if frame % 90 == 0 {
            app.report();
        }
    }
    app.report();
    Ok(())
}
