//! # avatar-ik
//!
//! Upper-body inverse kinematics for tracked avatars, operating on an abstract
//! bone hierarchy.
//!
//! ## Features
//! - Analytic two-bone arm solver with clavicle, elbow aperture and over-extension modes
//! - Wrist torsion tracking that stays continuous past half turns
//! - CCD chain solver with single or dual-axis angle-limited links
//! - Body orchestrator placing head, neck and spine under a head-mounted camera
//!
//! ## Example
//! ```rust,ignore
//! use avatar_ik::ik::{AvatarIk, AvatarIkConfig, FrameInput};
//! use avatar_ik::rig::HumanoidBuilder;
//! use avatar_ik::math::Transform;
//! use glam::Vec3;
//!
//! let humanoid = HumanoidBuilder::new().build();
//! let mut skeleton = humanoid.skeleton;
//! let mut ik = AvatarIk::new(&skeleton, &humanoid.rig, &AvatarIkConfig::default())?;
//!
//! let frame = FrameInput::new(Transform::from_position(Vec3::new(0.0, 1.7, 0.1)), 1.0 / 90.0)
//!     .with_hands(
//!         Transform::from_position(Vec3::new(-0.3, 1.1, 0.3)),
//!         Transform::from_position(Vec3::new(0.3, 1.1, 0.3)),
//!     );
//! ik.update(&mut skeleton, &frame);
//! ```

pub mod dynamics;
pub mod error;
pub mod ik;
pub mod math;
pub mod rig;
pub mod skeleton;

pub use dynamics::{smooth_damp, Interpolatable, SmoothDamped};
pub use error::RigError;
pub use ik::{
    ArmIkConfig, ArmIkSolver, AvatarIk, AvatarIkConfig, BodyIk, BodyIkSettings, CcdLink,
    CcdSolveResult, CcdSolver, FrameInput, OverExtendMode, WristTorsion,
};
pub use math::Transform;
pub use rig::{AvatarRig, AvatarRigInfo, Side};
pub use skeleton::{BoneId, Skeleton, SkeletonPose, UniversalLocalAxes};
