//! Annotation Storage
//!
//! Checksum-keyed persistence of clip partitions.
//!
//! File layout: one JSON object whose first entry is the reserved
//! `<application:meta-info>` record, followed by one record per video keyed
//! by the hex digest of its content.

pub mod migration;
pub mod models;
pub mod store;

pub use models::*;
pub use store::{decode_annotation_file, AnnotationStore};
