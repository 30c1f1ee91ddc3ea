//! Clip Partitioning
//!
//! Break points, the clips derived from them, keyframes and loop ranges.

pub mod keyframes;
pub mod loop_range;
pub mod models;
pub mod partition;

pub use keyframes::{KeyframeGenerator, DEFAULT_FLOW_THRESHOLD};
pub use loop_range::connected_range;
pub use models::*;
pub use partition::{ClipPartition, KeyframeReset};
