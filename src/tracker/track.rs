//! A single tracked identity.

use crate::tracker::geometry::Point;
use crate::tracker::observation::Observation;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Tracked person identity with accumulated time.
///
/// Times are absolute frame timestamps in seconds, as supplied by the caller.
/// The reference embedding of an identity lives in the
/// [`IdentityGallery`](crate::tracker::IdentityGallery), not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Unique identity id, allocated once per session
    pub id: u64,
    /// Current lifecycle state
    pub state: TrackState,
    /// Last known centroid
    pub last_centroid: Point,
    /// Last known bounding box
    pub last_bbox: Rect,
    /// Timestamp of the frame that created the track
    pub first_seen_time: f64,
    /// Timestamp of the most recent matched frame
    pub last_seen_time: f64,
    /// Seconds spent matched and frontal
    pub attention_time: f64,
    /// Seconds spent matched
    pub total_time: f64,
}

impl Track {
    /// Create an active track from its first observation.
    pub fn new(id: u64, observation: &Observation, time: f64) -> Self {
        Self {
            id,
            state: TrackState::Active,
            last_centroid: observation.centroid,
            last_bbox: observation.bbox,
            first_seen_time: time,
            last_seen_time: time,
            attention_time: 0.0,
            total_time: 0.0,
        }
    }

    /// Refresh position and last-seen time. Accumulated time is untouched.
    pub fn apply_match(&mut self, observation: &Observation, time: f64) {
        if observation.has_finite_centroid() {
            self.last_centroid = observation.centroid;
        }
        if observation.bbox.is_finite() {
            self.last_bbox = observation.bbox;
        }
        self.last_seen_time = self.last_seen_time.max(time);
        self.state = TrackState::Active;
    }

    /// Seconds since the last match.
    #[inline]
    pub fn time_since_seen(&self, now: f64) -> f64 {
        now - self.last_seen_time
    }

    #[inline]
    pub fn is_stale(&self, now: f64, stale_timeout: f64) -> bool {
        self.time_since_seen(now) > stale_timeout
    }

    pub fn mark_evicted(&mut self) {
        self.state = TrackState::Evicted;
    }

    pub fn is_active(&self) -> bool {
        self.state == TrackState::Active
    }
}
