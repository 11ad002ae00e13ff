//! Matching utilities for associating observations with identities.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tracker::geometry::{Point, centroid_distance, cosine_similarity};
use crate::tracker::lifecycle::TrackRegistry;
use crate::tracker::observation::{Observation, Rejection};

/// Which identity key a session matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Nearest centroid among active tracks
    #[default]
    Spatial,
    /// Highest cosine similarity against the identity gallery
    Embedding,
}

/// Assignment algorithm used once the score matrix is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSolver {
    /// Best pair first, with lower row then lower column winning ties
    #[default]
    Greedy,
    /// Minimum total cost (Jonker-Volgenant), gated by the same acceptance bound.
    /// Among equal-cost pairings, lower rows take lower columns.
    Optimal,
}

/// Direction in which a score matrix is "better".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// Smaller is better (distances)
    Ascending,
    /// Larger is better (similarities)
    Descending,
}

/// Result of assigning rows (identities) to columns (observations).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    /// Accepted `(row, column)` pairs
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

impl AssignmentResult {
    fn from_masks(matches: Vec<(usize, usize)>, row_used: &[bool], col_used: &[bool]) -> Self {
        let unused = |mask: &[bool]| -> Vec<usize> {
            mask.iter()
                .enumerate()
                .filter_map(|(i, &used)| if used { None } else { Some(i) })
                .collect()
        };
        Self {
            unmatched_tracks: unused(row_used),
            unmatched_detections: unused(col_used),
            matches,
        }
    }
}

/// Compute the Euclidean distance matrix between track and observation centroids.
pub fn distance_matrix(track_points: &[Point], observation_points: &[Point]) -> Array2<f32> {
    let mut dists = Array2::zeros((track_points.len(), observation_points.len()));
    for (i, t) in track_points.iter().enumerate() {
        for (j, o) in observation_points.iter().enumerate() {
            dists[[i, j]] = centroid_distance(t, o);
        }
    }
    dists
}

/// Cosine similarity matrix between gallery rows and observation rows.
///
/// Both inputs hold unit-length embeddings, one per row.
pub fn similarity_matrix(gallery: &Array2<f32>, observations: &Array2<f32>) -> Array2<f32> {
    Array2::from_shape_fn((gallery.nrows(), observations.nrows()), |(i, j)| {
        cosine_similarity(gallery.row(i), observations.row(j))
    })
}

/// Greedy one-to-one assignment.
///
/// Candidate pairs are visited best score first; ties go to the lower row,
/// then the lower column. A pair is taken when both sides are still free and
/// `accept(row, column, score)` holds. NaN scores never match.
pub fn greedy_assignment(
    scores: &Array2<f32>,
    order: ScoreOrder,
    accept: impl Fn(usize, usize, f32) -> bool,
) -> AssignmentResult {
    let (num_rows, num_cols) = scores.dim();

    let mut candidates: Vec<(f32, usize, usize)> = scores
        .indexed_iter()
        .filter(|(_, s)| !s.is_nan())
        .map(|((row, col), &s)| (s, row, col))
        .collect();
    candidates.sort_by(|a, b| {
        let by_score = match order {
            ScoreOrder::Ascending => a.0.total_cmp(&b.0),
            ScoreOrder::Descending => b.0.total_cmp(&a.0),
        };
        by_score.then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2))
    });

    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut matches = Vec::new();

    for (score, row, col) in candidates {
        if row_used[row] || col_used[col] {
            continue;
        }
        if !accept(row, col, score) {
            continue;
        }
        row_used[row] = true;
        col_used[col] = true;
        matches.push((row, col));
    }

    AssignmentResult::from_masks(matches, &row_used, &col_used)
}

/// Minimum-cost one-to-one assignment, keeping only pairs for which
/// `accept(row, column)` holds.
pub fn linear_assignment(
    cost_matrix: &Array2<f32>,
    accept: impl Fn(usize, usize) -> bool,
) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult::from_masks(vec![], &vec![false; num_rows], &vec![false; num_cols]);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

    for i in 0..num_rows {
        for j in 0..num_cols {
            let cost = cost_matrix[[i, j]];
            if cost.is_finite() {
                padded[[i, j]] = cost as f64;
            }
        }
    }

    let mut assigned: Vec<Option<usize>> = match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => row_to_col
            .iter()
            .take(num_rows)
            .map(|&col| (col < num_cols).then_some(col))
            .collect(),
        Err(e) => {
            warn!(rows = num_rows, cols = num_cols, "linear assignment failed: {e:?}");
            vec![None; num_rows]
        }
    };
    settle_ties(&padded, &mut assigned, num_cols, &accept);

    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut matches = vec![];
    for (row, col) in assigned.into_iter().enumerate() {
        if let Some(col) = col {
            if accept(row, col) {
                matches.push((row, col));
                row_used[row] = true;
                col_used[col] = true;
            }
        }
    }

    AssignmentResult::from_masks(matches, &row_used, &col_used)
}

/// Rewrite an optimal assignment so that, among pairings of equal cost, lower
/// rows hold lower columns. Moves only ever land on accepted pairs.
///
/// Each step either lowers the sum of assigned columns or removes an
/// inversion without changing that sum, so the loop terminates.
fn settle_ties(
    cost: &Array2<f64>,
    assigned: &mut [Option<usize>],
    num_cols: usize,
    accept: &impl Fn(usize, usize) -> bool,
) {
    let mut taken = vec![false; num_cols];
    for col in assigned.iter().flatten() {
        taken[*col] = true;
    }

    let mut changed = true;
    while changed {
        changed = false;

        // Slide a row onto a free lower column of the same cost.
        for row in 0..assigned.len() {
            let Some(col) = assigned[row] else { continue };
            let free = (0..col).find(|&c| {
                !taken[c] && cost[[row, c]] == cost[[row, col]] && accept(row, c)
            });
            if let Some(c) = free {
                taken[col] = false;
                taken[c] = true;
                assigned[row] = Some(c);
                changed = true;
            }
        }

        // Uncross two rows whose columns can be exchanged at equal cost.
        for r1 in 0..assigned.len() {
            for r2 in r1 + 1..assigned.len() {
                let (Some(c1), Some(c2)) = (assigned[r1], assigned[r2]) else { continue };
                if c1 > c2
                    && cost[[r1, c2]] == cost[[r1, c1]]
                    && cost[[r2, c1]] == cost[[r2, c2]]
                    && accept(r1, c2)
                    && accept(r2, c1)
                {
                    assigned[r1] = Some(c2);
                    assigned[r2] = Some(c1);
                    changed = true;
                }
            }
        }
    }
}

/// Outcome of associating one frame's observations with known identities.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Accepted `(observation index, identity id)` pairs
    pub matches: Vec<(usize, u64)>,
    /// Observations that should mint new identities
    pub unmatched_observations: Vec<usize>,
    /// Candidate identities that received no observation
    pub unmatched_ids: Vec<u64>,
    /// Validated unit embeddings, indexed like the observation batch
    pub embeddings: Vec<Option<Array1<f32>>>,
    /// Observations excluded from matching, with the reason
    pub rejections: Vec<Rejection>,
}

/// Associates a frame's observations with identities known to the registry.
///
/// Implementations must produce a one-to-one assignment and must never panic
/// on malformed observations; those are reported as rejections instead.
pub trait Matcher {
    /// Strategy this matcher implements.
    fn strategy(&self) -> MatchStrategy;

    /// Match `observations` against the registry's candidates.
    fn associate(&self, observations: &[Observation], registry: &TrackRegistry) -> MatchOutcome;
}
