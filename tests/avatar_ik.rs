use approx::assert_abs_diff_eq;
use avatar_ik::ik::{AvatarIk, AvatarIkConfig, BodyIkSettings, FrameInput};
use avatar_ik::math::Transform;
use avatar_ik::rig::{HumanoidBuilder, Side};
use avatar_ik::skeleton::{BoneId, SkeletonPose};
use avatar_ik::RigError;
use glam::{Quat, Vec3};

const EYES: Vec3 = Vec3::new(0.0, 1.7, 0.1);

fn hands() -> (Transform, Transform) {
    (
        Transform::new(Vec3::new(-0.3, 1.2, 0.3), Quat::from_rotation_z(0.5)),
        Transform::new(Vec3::new(0.35, 1.3, 0.25), Quat::from_rotation_x(-0.4)),
    )
}

#[test]
fn update_puts_hands_on_their_targets() {
    let humanoid = HumanoidBuilder::new().build();
    let mut skel = humanoid.skeleton;
    let mut ik = AvatarIk::new(&skel, &humanoid.rig, &AvatarIkConfig::default()).unwrap();
    let (left, right) = hands();

    for _ in 0..30 {
        let frame = FrameInput::new(Transform::from_position(EYES), 1.0 / 90.0).with_hands(left, right);
        ik.update(&mut skel, &frame);
    }

    for (side, target) in [(Side::Left, left), (Side::Right, right)] {
        let hand = skel.world_transform(ik.arm(side).unwrap().info().hand.bone);
        assert_abs_diff_eq!(hand.position, target.position, epsilon = 1e-4);
        assert!(hand.rotation.abs_diff_eq(target.rotation, 1e-4));
        assert!(ik.arm(side).unwrap().elbow_aperture().is_some());
    }
}

#[test]
fn neck_tracks_a_walking_camera() {
    let humanoid = HumanoidBuilder::new().build();
    let neck = humanoid.rig.body.neck.unwrap();
    let mut skel = humanoid.skeleton;
    let rest_neck = skel.position(neck);
    let mut ik = AvatarIk::new(&skel, &humanoid.rig, &AvatarIkConfig::default()).unwrap();

    let step = Vec3::new(0.0, 0.0, 0.01);
    let mut camera = Transform::from_position(EYES);
    for _ in 0..50 {
        camera.position += step;
        ik.update(&mut skel, &FrameInput::new(camera, 1.0 / 90.0));
    }

    // The torso twist after the arm solve rotates about the spine axis, which the neck sits on.
    assert_abs_diff_eq!(skel.position(neck), rest_neck + step * 50.0, epsilon = 1e-3);
}

#[test]
fn missing_arm_bones_disable_only_that_arm() {
    let mut humanoid = HumanoidBuilder::new().build();
    humanoid.rig.left_arm.forearm = None;
    let mut skel = humanoid.skeleton;
    let mut ik = AvatarIk::new(&skel, &humanoid.rig, &AvatarIkConfig::default()).unwrap();
    let (left, right) = hands();

    ik.update(
        &mut skel,
        &FrameInput::new(Transform::from_position(EYES), 1.0 / 90.0).with_hands(left, right),
    );

    assert!(ik.arm(Side::Left).is_none());
    let right_hand = skel.position(ik.arm(Side::Right).unwrap().info().hand.bone);
    assert_abs_diff_eq!(right_hand, right.position, epsilon = 1e-4);
}

#[test]
fn unknown_bones_fail_to_bind() {
    let mut humanoid = HumanoidBuilder::new().build();
    humanoid.rig.body.head = Some(BoneId(4096));

    let err = AvatarIk::new(&humanoid.skeleton, &humanoid.rig, &AvatarIkConfig::default()).unwrap_err();

    assert!(matches!(err, RigError::UnknownBone { role: "head", .. }));
}

#[test]
fn reset_returns_to_unbound_state() {
    let humanoid = HumanoidBuilder::new().build();
    let mut skel = humanoid.skeleton;
    let config = AvatarIkConfig::default().with_body(BodyIkSettings::default().with_lock_body_pivot(true));
    let mut ik = AvatarIk::new(&skel, &humanoid.rig, &config).unwrap();
    let (left, right) = hands();
    ik.update(
        &mut skel,
        &FrameInput::new(Transform::from_position(EYES), 1.0 / 90.0).with_hands(left, right),
    );

    ik.reset();

    assert!(ik.body().unwrap().forward_target().is_none());
    for side in [Side::Left, Side::Right] {
        let arm = ik.arm(side).unwrap();
        assert!(arm.elbow_aperture().is_none());
        assert_eq!(arm.wrist_torsion(), 0.0);
    }
}
