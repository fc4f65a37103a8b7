//! Skeleton model
//!
//! - [`Skeleton`]: arena of bones addressed by [`BoneId`], parents before children
//! - [`SkeletonPose`]: the only interface the solvers use to read and write poses
//! - [`UniversalLocalAxes`]: per-bone canonical axis convention captured at bind time

mod axes;
mod bone;
mod pose;

pub use axes::UniversalLocalAxes;
pub use bone::{Bone, BoneId, Skeleton};
pub use pose::SkeletonPose;
