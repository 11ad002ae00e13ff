//! Stable per-person identities and looked-at-camera time from per-frame
//! face observations.
//!
//! The [`AttentionEngine`] consumes one batch of [`Observation`]s per frame,
//! associates them with persistent identities (by centroid distance or by
//! embedding similarity), accumulates attention and on-screen time, evicts
//! stale tracks and finally produces a [`SessionReport`].

pub mod error;
pub mod integration;
pub mod report;
pub mod tracker;

pub use error::{Error, Result};
pub use integration::{AttentionPipeline, ObservationBuilder, ObservationSource};
pub use report::{ReportRow, SessionReport, SessionSummary, TimelineSample};
pub use tracker::{
    AttentionEngine, EngineConfig, FrameOutcome, MatchStrategy, Observation, Rect, Track,
    TrackSnapshot, TrackState,
};
