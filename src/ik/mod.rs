//! Inverse Kinematics module
//!
//! Analytic two-bone arm solving, wrist torsion tracking, CCD chains and the
//! body orchestrator that ties them together per frame.

pub mod arm;
pub mod avatar;
pub mod body;
pub mod ccd;
pub mod config;
pub mod constraint;
pub mod torsion;

pub use arm::{ArmIkSolver, ArmSolveContext};
pub use avatar::{AvatarIk, FrameInput};
pub use body::{ArmSample, BodyIk};
pub use ccd::{AngleLimits, CcdConstraint, CcdLink, CcdSolveResult, CcdSolver, CcdSolverBuilder};
pub use config::{
    ArmIkConfig, ArmSolveOptions, AvatarIkConfig, BodyIkSettings, OverExtendMode,
    WristTorsionLimits,
};
pub use constraint::ConeLimit;
pub use torsion::WristTorsion;
