//! Active-track table, eviction history and identity gallery.

use std::collections::BTreeMap;

use ndarray::Array1;
use tracing::{debug, info, warn};

use crate::tracker::gallery::IdentityGallery;
use crate::tracker::observation::Observation;
use crate::tracker::track::Track;

/// How a matched identity came back into the active table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The identity was already active
    Continued,
    /// The identity had been evicted and is active again under the same id
    Reidentified,
}

/// Owns every track of a session.
///
/// `active` holds tracks matched within the staleness window, `evicted`
/// holds the rest. A track id lives in exactly one of the two maps, and the
/// union of both is never shrunk, so reporting always sees every identity.
#[derive(Debug, Clone)]
pub struct TrackRegistry {
    active: BTreeMap<u64, Track>,
    evicted: BTreeMap<u64, Track>,
    gallery: IdentityGallery,
    next_id: u64,
}

impl TrackRegistry {
    pub fn new(gallery: IdentityGallery) -> Self {
        Self {
            active: BTreeMap::new(),
            evicted: BTreeMap::new(),
            gallery,
            next_id: 1,
        }
    }

    /// Active tracks in ascending id order.
    pub fn active(&self) -> impl Iterator<Item = &Track> {
        self.active.values()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Evicted tracks in ascending id order.
    pub fn evicted(&self) -> impl Iterator<Item = &Track> {
        self.evicted.values()
    }

    pub fn gallery(&self) -> &IdentityGallery {
        &self.gallery
    }

    /// Look up a track in either table.
    pub fn get(&self, id: u64) -> Option<&Track> {
        self.active.get(&id).or_else(|| self.evicted.get(&id))
    }

    pub fn active_mut(&mut self, id: u64) -> Option<&mut Track> {
        self.active.get_mut(&id)
    }

    /// Every track ever created, active and evicted, in ascending id order.
    pub fn history(&self) -> Vec<&Track> {
        let mut all: Vec<&Track> = self.active.values().chain(self.evicted.values()).collect();
        all.sort_unstable_by_key(|t| t.id);
        all
    }

    /// Number of ids allocated so far.
    pub fn total_created(&self) -> u64 {
        self.next_id - 1
    }

    /// Mint a new identity for an unmatched observation.
    ///
    /// A validated embedding, when present, becomes the identity's gallery
    /// reference.
    pub fn create(&mut self, observation: &Observation, embedding: Option<Array1<f32>>, time: f64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        if let Some(embedding) = embedding {
            self.gallery.insert(id, embedding);
        }
        self.active.insert(id, Track::new(id, observation, time));
        debug!(id, x = observation.centroid.x, y = observation.centroid.y, "created track");
        id
    }

    /// Apply a match to the identity `id`.
    ///
    /// An evicted identity is moved back into the active table under the same
    /// id. Returns `None` when `id` is unknown.
    pub fn apply_match(
        &mut self,
        id: u64,
        observation: &Observation,
        embedding: Option<Array1<f32>>,
        time: f64,
    ) -> Option<MatchKind> {
        let kind = if self.active.contains_key(&id) {
            MatchKind::Continued
        } else if let Some(track) = self.evicted.remove(&id) {
            info!(
                id,
                gap_s = time - track.last_seen_time,
                "re-identified evicted track"
            );
            self.active.insert(id, track);
            MatchKind::Reidentified
        } else {
            warn!(id, "match against unknown identity ignored");
            return None;
        };

        if let Some(embedding) = embedding {
            self.gallery.refresh(id, embedding);
        }
        if let Some(track) = self.active.get_mut(&id) {
            track.apply_match(observation, time);
        }
        Some(kind)
    }

    /// Evict every active track with `now - last_seen_time > stale_timeout`.
    ///
    /// Evicted ids are returned in ascending order. Gallery entries stay.
    pub fn evict_stale(&mut self, now: f64, stale_timeout: f64) -> Vec<u64> {
        let stale: Vec<u64> = self
            .active
            .values()
            .filter(|t| t.is_stale(now, stale_timeout))
            .map(|t| t.id)
            .collect();

        for &id in &stale {
            if let Some(mut track) = self.active.remove(&id) {
                debug!(
                    id,
                    attention_s = track.attention_time,
                    total_s = track.total_time,
                    "evicted stale track"
                );
                track.mark_evicted();
                self.evicted.insert(id, track);
            }
        }
        stale
    }
}
