//! vidanno Core Library
//!
//! Annotation model for splitting videos into labeled clips.
//!
//! A video is partitioned by break points into contiguous clips. Each clip can
//! be labeled Accept or Reject with reasons from a configured catalog, and
//! Accept clips carry keyframes, either toggled by hand or generated from a
//! motion flow signal. Partitions are stored in a JSON file keyed by the
//! content checksum of each video, so annotations follow the file content
//! across renames and moves.

pub mod annotations;
pub mod checksum;
pub mod clips;
pub mod flow;
pub mod fs;
pub mod playlist;
pub mod session;
pub mod settings;

mod error;
mod types;

pub use error::*;
pub use types::*;
