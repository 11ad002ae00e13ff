//! Frontal gating and per-frame time accumulation.

use crate::tracker::geometry::HeadPose;
use crate::tracker::observation::Observation;
use crate::tracker::track::Track;

/// Head-pose gate deciding whether a face looks at the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrontalGate {
    pub yaw_threshold: f32,
    pub pitch_threshold: f32,
}

impl Default for FrontalGate {
    fn default() -> Self {
        Self {
            yaw_threshold: 0.25,
            pitch_threshold: 0.7,
        }
    }
}

impl FrontalGate {
    pub fn new(yaw_threshold: f32, pitch_threshold: f32) -> Self {
        Self {
            yaw_threshold,
            pitch_threshold,
        }
    }

    /// Frontal iff both ratios are strictly below their thresholds.
    #[inline]
    pub fn is_frontal(&self, pose: &HeadPose) -> bool {
        pose.yaw_ratio < self.yaw_threshold && pose.pitch_ratio < self.pitch_threshold
    }

    /// Decide whether an observation counts as attention.
    ///
    /// Uses the detector's frontal flag if present, then its yaw/pitch
    /// ratios, then ratios computed from landmarks. An observation with none
    /// of these comes from a frontal-only detector and counts as frontal.
    pub fn resolve(&self, observation: &Observation) -> bool {
        if let Some(frontal) = observation.frontal {
            return frontal;
        }
        if let Some(pose) = &observation.head_pose {
            return self.is_frontal(pose);
        }
        match &observation.landmarks {
            Some(landmarks) if landmarks.is_finite() => self.is_frontal(&landmarks.head_pose()),
            Some(_) => false,
            None => true,
        }
    }
}

/// Credit one matched frame to `track`.
///
/// `total_time` always grows by `dt`; `attention_time` only when `frontal`.
/// A non-positive or non-finite `dt` credits nothing.
pub fn credit(track: &mut Track, frontal: bool, dt: f64) {
    if !dt.is_finite() || dt <= 0.0 {
        return;
    }
    track.total_time += dt;
    if frontal {
        track.attention_time += dt;
    }
}
