//! AttentionPipeline for combining detection with attention tracking.

use crate::error::Result;
use crate::tracker::{AttentionEngine, EngineConfig, FrameOutcome};

use super::ObservationSource;

/// Bundles an `ObservationSource` with an `AttentionEngine`.
///
/// The pipeline does not read a clock either: every frame is processed with
/// the caller's timestamp, and `dt` is derived from the previous frame
/// (0 for the first one).
pub struct AttentionPipeline<D: ObservationSource> {
    detector: D,
    engine: AttentionEngine,
    prev_time: Option<f64>,
}

impl<D: ObservationSource> AttentionPipeline<D> {
    /// Create a new pipeline with the given detector and engine config.
    pub fn new(detector: D, config: EngineConfig) -> Result<Self> {
        Ok(Self {
            detector,
            engine: AttentionEngine::new(config)?,
            prev_time: None,
        })
    }

    /// Create a new pipeline with the default spatial configuration.
    pub fn with_default_config(detector: D) -> Result<Self> {
        Self::new(detector, EngineConfig::default())
    }

    /// Detect faces in one frame captured at `time` and update the engine.
    ///
    /// A detector error leaves the engine untouched; the frame is simply not
    /// processed.
    pub fn process_frame(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        time: f64,
    ) -> std::result::Result<FrameOutcome, D::Error> {
        let observations = self.detector.detect(frame, width, height)?;
        let dt = self.prev_time.map_or(0.0, |prev| time - prev);
        self.prev_time = Some(time);
        Ok(self.engine.update(&observations, time, dt))
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn engine(&self) -> &AttentionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AttentionEngine {
        &mut self.engine
    }
}
