//! Main per-frame engine: matching, lifecycle, accumulation and eviction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::report::{SessionReport, TimelineSample};
use crate::tracker::attention::{self, FrontalGate};
use crate::tracker::gallery::{IdentityGallery, ReferenceUpdate};
use crate::tracker::lifecycle::{MatchKind, TrackRegistry};
use crate::tracker::matchers::{EmbeddingMatcher, SpatialMatcher};
use crate::tracker::matching::{AssignmentSolver, MatchStrategy, Matcher};
use crate::tracker::observation::{Observation, Rejection};

/// Frame width the default pixel thresholds are calibrated for.
pub const REFERENCE_FRAME_WIDTH: f32 = 640.0;

/// Configuration for the AttentionEngine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub strategy: MatchStrategy,
    /// Seconds a track may go unmatched before it is evicted
    pub stale_timeout: f64,
    /// Minimum cosine similarity (exclusive) for an embedding match
    pub similarity_threshold: f32,
    /// Base centroid match radius in pixels
    pub spatial_distance_threshold: f32,
    /// Radius also scales with the face: `size_factor * max(w, h)`
    pub spatial_size_factor: f32,
    pub yaw_threshold: f32,
    pub pitch_threshold: f32,
    /// Expected embedding length; taken from the first embedding when unset
    pub embedding_dim: Option<usize>,
    pub reference_update: ReferenceUpdate,
    pub solver: AssignmentSolver,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Spatial,
            stale_timeout: 3.0,
            similarity_threshold: 0.45,
            spatial_distance_threshold: 50.0,
            spatial_size_factor: 0.6,
            yaw_threshold: 0.25,
            pitch_threshold: 0.7,
            embedding_dim: None,
            reference_update: ReferenceUpdate::Overwrite,
            solver: AssignmentSolver::Greedy,
        }
    }
}

impl EngineConfig {
    pub fn spatial() -> Self {
        Self::default()
    }

    pub fn embedding() -> Self {
        Self {
            strategy: MatchStrategy::Embedding,
            ..Self::default()
        }
    }

    /// Scale the pixel match radius from the 640-pixel reference frame to `frame_width`.
    pub fn scaled_to_frame(mut self, frame_width: f32) -> Self {
        if frame_width.is_finite() && frame_width > 0.0 {
            self.spatial_distance_threshold *= frame_width / REFERENCE_FRAME_WIDTH;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        };
        positive("stale_timeout", self.stale_timeout)?;
        positive("spatial_distance_threshold", self.spatial_distance_threshold as f64)?;
        positive("yaw_threshold", self.yaw_threshold as f64)?;
        positive("pitch_threshold", self.pitch_threshold as f64)?;

        if !self.spatial_size_factor.is_finite() || self.spatial_size_factor < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "spatial_size_factor must be non-negative, got {}",
                self.spatial_size_factor
            )));
        }
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::InvalidConfig(format!(
                "similarity_threshold must lie in [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.embedding_dim == Some(0) {
            return Err(Error::InvalidConfig("embedding_dim must be non-zero".into()));
        }
        if let ReferenceUpdate::Smoothed { momentum } = self.reference_update {
            if !(0.0..1.0).contains(&momentum) {
                return Err(Error::InvalidConfig(format!(
                    "reference momentum must lie in [0, 1), got {momentum}"
                )));
            }
        }
        Ok(())
    }

    pub fn frontal_gate(&self) -> FrontalGate {
        FrontalGate::new(self.yaw_threshold, self.pitch_threshold)
    }

    /// Build the matcher selected by `strategy`.
    pub fn build_matcher(&self) -> Box<dyn Matcher> {
        match self.strategy {
            MatchStrategy::Spatial => Box::new(SpatialMatcher::new(
                self.spatial_distance_threshold,
                self.spatial_size_factor,
                self.solver,
            )),
            MatchStrategy::Embedding => {
                Box::new(EmbeddingMatcher::new(self.similarity_threshold, self.solver))
            }
        }
    }
}

/// Result of one `update` cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// `1 / dt`, or 0 when `dt` is not positive
    pub fps_hint: f64,
    /// Observations supplied for this frame
    pub detected_count: usize,
    /// Active tracks after eviction
    pub tracked_count: usize,
    /// `(observation index, identity id)` for every observation that was tracked
    pub assignments: Vec<(usize, u64)>,
    /// Identities minted this frame
    pub created: Vec<u64>,
    /// Evicted identities matched again this frame
    pub reidentified: Vec<u64>,
    /// Identities evicted at the end of this frame
    pub evicted: Vec<u64>,
    pub rejections: Vec<Rejection>,
}

/// Live per-identity times for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub attention_s: f64,
    pub total_s: f64,
}

/// Identity tracking and attention accounting for one session.
///
/// The engine never reads a clock. Callers pass each frame's timestamp and
/// the elapsed time since the previous processed frame.
pub struct AttentionEngine {
    config: EngineConfig,
    matcher: Box<dyn Matcher>,
    gate: FrontalGate,
    registry: TrackRegistry,
    timeline: Vec<TimelineSample>,
    session_start: Option<f64>,
    last_time: Option<f64>,
    frames: u64,
}

impl AttentionEngine {
    /// Create an engine with the matcher selected by `config.strategy`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let matcher = config.build_matcher();
        Self::with_matcher(config, matcher)
    }

    /// Create an engine around a caller-supplied matcher.
    pub fn with_matcher(config: EngineConfig, matcher: Box<dyn Matcher>) -> Result<Self> {
        config.validate()?;
        if matcher.strategy() != config.strategy {
            warn!(
                configured = ?config.strategy,
                matcher = ?matcher.strategy(),
                "matcher strategy differs from configuration"
            );
        }
        info!(strategy = ?matcher.strategy(), stale_timeout = config.stale_timeout, "attention engine ready");

        let gallery = IdentityGallery::new(config.embedding_dim, config.reference_update);
        Ok(Self {
            gate: config.frontal_gate(),
            registry: TrackRegistry::new(gallery),
            matcher,
            config,
            timeline: Vec::new(),
            session_start: None,
            last_time: None,
            frames: 0,
        })
    }

    /// Create an engine whose session starts at `start_time` rather than at the first frame.
    pub fn with_start_time(config: EngineConfig, start_time: f64) -> Result<Self> {
        let mut engine = Self::new(config)?;
        engine.session_start = Some(start_time);
        Ok(engine)
    }

    /// Run one full cycle: match, apply, accumulate, evict, sample the timeline.
    ///
    /// A frame with a non-finite timestamp is dropped whole: nothing is
    /// matched, credited or sampled, and the session clock is left untouched.
    pub fn update(&mut self, observations: &[Observation], time: f64, dt: f64) -> FrameOutcome {
        if !time.is_finite() {
            warn!(time, detected = observations.len(), "dropping frame with invalid timestamp");
            return FrameOutcome {
                detected_count: observations.len(),
                tracked_count: self.registry.active_count(),
                ..FrameOutcome::default()
            };
        }
        let session_start = *self.session_start.get_or_insert(time);
        if let Some(last) = self.last_time {
            if time < last {
                warn!(time, last, "frame timestamp went backwards");
            }
        }
        self.last_time = Some(time);
        self.frames += 1;

        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "ignoring invalid frame interval");
        }
        let fps_hint = if dt.is_finite() && dt > 0.0 { 1.0 / dt } else { 0.0 };

        let mut matched = self.matcher.associate(observations, &self.registry);
        let mut outcome = FrameOutcome {
            fps_hint,
            detected_count: observations.len(),
            ..FrameOutcome::default()
        };

        // Each observation and each identity may be used once per frame.
        let mut claimed = vec![false; observations.len()];
        let mut matched_ids = BTreeSet::new();
        let mut unmatched = Vec::new();
        for &(index, id) in &matched.matches {
            if !claim(&mut claimed, index) {
                continue;
            }
            let observation = &observations[index];
            if !matched_ids.insert(id) {
                warn!(id, index, "identity matched twice in one frame");
                unmatched.push(index);
                continue;
            }
            let embedding = matched.embeddings.get_mut(index).and_then(Option::take);
            match self.registry.apply_match(id, observation, embedding, time) {
                Some(kind) => {
                    if kind == MatchKind::Reidentified {
                        outcome.reidentified.push(id);
                    }
                    self.credit(id, observation, dt);
                    outcome.assignments.push((index, id));
                }
                None => unmatched.push(index),
            }
        }
        for &index in &matched.unmatched_observations {
            if claim(&mut claimed, index) {
                unmatched.push(index);
            }
        }

        unmatched.sort_unstable();
        for index in unmatched {
            let observation = &observations[index];
            let embedding = matched.embeddings.get_mut(index).and_then(Option::take);
            let id = self.registry.create(observation, embedding, time);
            self.credit(id, observation, dt);
            outcome.created.push(id);
            outcome.assignments.push((index, id));
        }
        outcome.assignments.sort_unstable();

        outcome.evicted = self.registry.evict_stale(time, self.config.stale_timeout);
        outcome.tracked_count = self.registry.active_count();
        outcome.rejections = matched.rejections;

        self.timeline.push(TimelineSample {
            time_seconds: time - session_start,
            people_count: outcome.tracked_count,
        });

        debug!(
            frame = self.frames,
            detected = outcome.detected_count,
            tracked = outcome.tracked_count,
            created = outcome.created.len(),
            evicted = outcome.evicted.len(),
            "frame processed"
        );
        outcome
    }

    fn credit(&mut self, id: u64, observation: &Observation, dt: f64) {
        let frontal = self.gate.resolve(observation);
        if let Some(track) = self.registry.active_mut(id) {
            attention::credit(track, frontal, dt);
        }
    }

    /// Attention and total seconds of every active identity.
    pub fn snapshot_summary(&self) -> BTreeMap<u64, TrackSnapshot> {
        self.registry
            .active()
            .map(|t| {
                (
                    t.id,
                    TrackSnapshot {
                        attention_s: t.attention_time,
                        total_s: t.total_time,
                    },
                )
            })
            .collect()
    }

    /// Build the session report, ending the session at the last processed frame.
    pub fn shutdown_report(&self) -> SessionReport {
        let start = self.session_start.unwrap_or(0.0);
        self.shutdown_report_at(self.last_time.unwrap_or(start))
    }

    /// Build the session report with an explicit session end time.
    pub fn shutdown_report_at(&self, session_end: f64) -> SessionReport {
        let start = self.session_start.unwrap_or(session_end);
        let report = SessionReport::build(
            &self.registry.history(),
            start,
            session_end,
            self.timeline.clone(),
        );
        info!(
            people = report.summary.total_people_watched,
            total_attention_s = report.summary.total_attention_time_s,
            duration_s = report.summary.campaign_duration_s,
            "session report built"
        );
        report
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn timeline(&self) -> &[TimelineSample] {
        &self.timeline
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn session_start(&self) -> Option<f64> {
        self.session_start
    }
}

/// Mark observation `index` as used, refusing out-of-range or repeated indices.
fn claim(claimed: &mut [bool], index: usize) -> bool {
    match claimed.get_mut(index) {
        Some(used) if !*used => {
            *used = true;
            true
        }
        Some(_) => {
            warn!(index, "observation assigned twice in one frame");
            false
        }
        None => {
            warn!(index, len = claimed.len(), "matcher returned an out-of-range observation");
            false
        }
    }
}
