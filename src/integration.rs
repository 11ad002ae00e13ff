//! Integration module for connecting face detection backends with the
//! attention engine.
//!
//! This module provides traits and utilities for feeding detector output
//! (boxes, landmarks, embeddings) into the engine, either live through an
//! `ObservationSource` or offline from a JSON-lines log.

mod builder;
mod detector;
mod pipeline;
mod replay;

pub use builder::ObservationBuilder;
pub use detector::ObservationSource;
pub use pipeline::AttentionPipeline;
pub use replay::{ReplayFrame, ReplayObservation, ReplayReader};
