use thiserror::Error;

use crate::skeleton::BoneId;

/// Errors raised while binding solvers to a skeleton.
///
/// Solving itself never fails; these only surface from setup calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    #[error("{role} references bone {bone:?}, which is not in the skeleton")]
    UnknownBone { role: &'static str, bone: BoneId },

    #[error("{role} has a degenerate rest length of {length}")]
    DegenerateBone { role: &'static str, length: f32 },

    #[error("CCD chain has no links")]
    EmptyChain,

    #[error("CCD chain has no end effector")]
    MissingEffector,

    #[error("CCD link {link} has a zero rotation axis")]
    InvalidAxis { link: usize },
}
