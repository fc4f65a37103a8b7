//! Frame-rate independent smoothing used by the solvers' persistent state.

mod smooth_damp;

pub use smooth_damp::{smooth_damp, Interpolatable, SmoothDamped};
