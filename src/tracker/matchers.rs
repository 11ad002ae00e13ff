//! The two session-scoped matching strategies.

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::tracker::gallery::validate_embedding;
use crate::tracker::geometry::Point;
use crate::tracker::lifecycle::TrackRegistry;
use crate::tracker::matching::{
    self, AssignmentResult, AssignmentSolver, MatchOutcome, MatchStrategy, Matcher, ScoreOrder,
};
use crate::tracker::observation::{Observation, RejectReason, Rejection};

/// Greedy nearest-centroid matching against active tracks.
///
/// An observation may claim a track whose last centroid lies strictly within
/// `max(distance_threshold, size_factor * max(bbox.w, bbox.h))` pixels.
#[derive(Debug, Clone)]
pub struct SpatialMatcher {
    pub distance_threshold: f32,
    pub size_factor: f32,
    pub solver: AssignmentSolver,
}

impl SpatialMatcher {
    pub fn new(distance_threshold: f32, size_factor: f32, solver: AssignmentSolver) -> Self {
        Self {
            distance_threshold,
            size_factor,
            solver,
        }
    }

    /// Match radius for one observation.
    pub fn radius_for(&self, observation: &Observation) -> f32 {
        if observation.bbox.is_finite() {
            self.distance_threshold
                .max(self.size_factor * observation.bbox.max_side())
        } else {
            self.distance_threshold
        }
    }
}

impl Matcher for SpatialMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Spatial
    }

    fn associate(&self, observations: &[Observation], registry: &TrackRegistry) -> MatchOutcome {
        let mut rejections = Vec::new();
        let valid: Vec<usize> = observations
            .iter()
            .enumerate()
            .filter_map(|(index, obs)| {
                if obs.has_finite_centroid() {
                    Some(index)
                } else {
                    warn!(index, "skipping observation with non-finite centroid");
                    rejections.push(Rejection {
                        index,
                        reason: RejectReason::NonFiniteCentroid,
                    });
                    None
                }
            })
            .collect();

        let track_ids: Vec<u64> = registry.active().map(|t| t.id).collect();
        let track_points: Vec<Point> = registry.active().map(|t| t.last_centroid).collect();
        let obs_points: Vec<Point> = valid.iter().map(|&i| observations[i].centroid).collect();
        let radii: Vec<f32> = valid
            .iter()
            .map(|&i| self.radius_for(&observations[i]))
            .collect();

        let dists = matching::distance_matrix(&track_points, &obs_points);
        let result = match self.solver {
            AssignmentSolver::Greedy => {
                matching::greedy_assignment(&dists, ScoreOrder::Ascending, |_, col, d| {
                    d < radii[col]
                })
            }
            AssignmentSolver::Optimal => {
                matching::linear_assignment(&dists, |row, col| dists[[row, col]] < radii[col])
            }
        };

        debug!(
            tracks = track_ids.len(),
            observations = valid.len(),
            matched = result.matches.len(),
            "spatial association"
        );

        outcome_from_assignment(
            result,
            &track_ids,
            &valid,
            vec![None; observations.len()],
            rejections,
        )
    }
}

/// Cosine-similarity re-identification against the identity gallery.
///
/// Every gallery identity is a candidate, including those whose track has
/// been evicted from the active table. A pair is accepted when its
/// similarity is strictly greater than `similarity_threshold`.
#[derive(Debug, Clone)]
pub struct EmbeddingMatcher {
    pub similarity_threshold: f32,
    pub solver: AssignmentSolver,
}

impl EmbeddingMatcher {
    pub fn new(similarity_threshold: f32, solver: AssignmentSolver) -> Self {
        Self {
            similarity_threshold,
            solver,
        }
    }
}

impl Matcher for EmbeddingMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Embedding
    }

    fn associate(&self, observations: &[Observation], registry: &TrackRegistry) -> MatchOutcome {
        let gallery = registry.gallery();
        let mut dim = gallery.dim();
        let mut embeddings: Vec<Option<Array1<f32>>> = vec![None; observations.len()];
        let mut rejections = Vec::new();
        let mut rejected = Vec::new();
        let mut valid = Vec::new();

        for (index, obs) in observations.iter().enumerate() {
            match validate_embedding(obs.embedding.as_ref(), dim) {
                Ok(embedding) => {
                    dim.get_or_insert(embedding.len());
                    embeddings[index] = Some(embedding);
                    valid.push(index);
                }
                Err(reason) => {
                    warn!(index, %reason, "embedding rejected, observation will mint a new identity");
                    rejections.push(Rejection { index, reason });
                    rejected.push(index);
                }
            }
        }

        let (gallery_ids, gallery_matrix) = gallery.matrix();
        let dim = dim.unwrap_or(0);
        let mut obs_matrix = Array2::zeros((valid.len(), dim));
        for (mut row, &index) in obs_matrix.rows_mut().into_iter().zip(&valid) {
            if let Some(embedding) = &embeddings[index] {
                row.assign(embedding);
            }
        }

        let result = if gallery_ids.is_empty() || valid.is_empty() {
            AssignmentResult {
                matches: vec![],
                unmatched_tracks: (0..gallery_ids.len()).collect(),
                unmatched_detections: (0..valid.len()).collect(),
            }
        } else {
            let sims = matching::similarity_matrix(&gallery_matrix, &obs_matrix);
            let threshold = self.similarity_threshold;
            match self.solver {
                AssignmentSolver::Greedy => {
                    matching::greedy_assignment(&sims, ScoreOrder::Descending, |_, _, s| {
                        s > threshold
                    })
                }
                AssignmentSolver::Optimal => {
                    let cost = sims.mapv(|s| 1.0 - s);
                    matching::linear_assignment(&cost, |row, col| sims[[row, col]] > threshold)
                }
            }
        };

        debug!(
            identities = gallery_ids.len(),
            observations = valid.len(),
            matched = result.matches.len(),
            "embedding association"
        );

        let mut outcome =
            outcome_from_assignment(result, &gallery_ids, &valid, embeddings, rejections);
        outcome.unmatched_observations.extend(rejected);
        outcome.unmatched_observations.sort_unstable();
        outcome
    }
}

/// Translate row/column indices back to identity ids and observation indices.
fn outcome_from_assignment(
    result: AssignmentResult,
    row_ids: &[u64],
    columns: &[usize],
    embeddings: Vec<Option<Array1<f32>>>,
    rejections: Vec<Rejection>,
) -> MatchOutcome {
    let mut matches: Vec<(usize, u64)> = result
        .matches
        .iter()
        .map(|&(row, col)| (columns[col], row_ids[row]))
        .collect();
    matches.sort_unstable();

    MatchOutcome {
        matches,
        unmatched_observations: result
            .unmatched_detections
            .iter()
            .map(|&col| columns[col])
            .collect(),
        unmatched_ids: result
            .unmatched_tracks
            .iter()
            .map(|&row| row_ids[row])
            .collect(),
        embeddings,
        rejections,
    }
}
