//! Long-lived identity store used for re-identification.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tracker::geometry::l2_normalize;
use crate::tracker::observation::RejectReason;

/// How a gallery reference embedding is refreshed on a successful match.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ReferenceUpdate {
    /// Replace the reference with the newest embedding.
    #[default]
    Overwrite,
    /// Exponential moving average, `ref = momentum * ref + (1 - momentum) * new`,
    /// renormalised to unit length.
    Smoothed { momentum: f32 },
}

/// Identity id -> reference embedding.
///
/// Entries outlive their track's stay in the active table, so an evicted
/// identity can be matched again.
#[derive(Debug, Clone, Default)]
pub struct IdentityGallery {
    entries: BTreeMap<u64, Array1<f32>>,
    dim: Option<usize>,
    update: ReferenceUpdate,
}

impl IdentityGallery {
    /// `dim` pins the embedding length; otherwise the first stored embedding fixes it.
    pub fn new(dim: Option<usize>, update: ReferenceUpdate) -> Self {
        Self {
            entries: BTreeMap::new(),
            dim,
            update,
        }
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&Array1<f32>> {
        self.entries.get(&id)
    }

    /// Identity ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    /// Check an observation embedding against the gallery dimension.
    pub fn validate(&self, embedding: Option<&Array1<f32>>) -> Result<Array1<f32>, RejectReason> {
        validate_embedding(embedding, self.dim)
    }

    /// Store the reference embedding of a newly minted identity.
    ///
    /// The caller passes embeddings that went through [`validate`](Self::validate).
    pub fn insert(&mut self, id: u64, embedding: Array1<f32>) -> bool {
        let dim = *self.dim.get_or_insert(embedding.len());
        if embedding.len() != dim {
            warn!(id, dim, got = embedding.len(), "refusing gallery entry with wrong dimension");
            return false;
        }
        self.entries.insert(id, embedding);
        true
    }

    /// Refresh the reference embedding of an existing identity.
    pub fn refresh(&mut self, id: u64, embedding: Array1<f32>) {
        if !self.entries.contains_key(&id) {
            self.insert(id, embedding);
            return;
        }
        if Some(embedding.len()) != self.dim {
            warn!(id, got = embedding.len(), "ignoring reference refresh with wrong dimension");
            return;
        }
        let update = self.update;
        let Some(reference) = self.entries.get_mut(&id) else {
            return;
        };
        match update {
            ReferenceUpdate::Overwrite => *reference = embedding,
            ReferenceUpdate::Smoothed { momentum } => {
                let blended = &*reference * momentum + &embedding * (1.0 - momentum);
                *reference = l2_normalize(&blended).unwrap_or(embedding);
            }
        }
    }

    /// Stack the references into an (identities x dim) matrix, rows in ascending id order.
    pub fn matrix(&self) -> (Vec<u64>, Array2<f32>) {
        let dim = self.dim.unwrap_or(0);
        let ids: Vec<u64> = self.ids().collect();
        let mut matrix = Array2::zeros((ids.len(), dim));
        for (mut row, reference) in matrix.rows_mut().into_iter().zip(self.entries.values()) {
            row.assign(reference);
        }
        (ids, matrix)
    }
}

/// Validate an embedding against an expected length and return its unit-length copy.
pub fn validate_embedding(
    embedding: Option<&Array1<f32>>,
    dim: Option<usize>,
) -> Result<Array1<f32>, RejectReason> {
    let embedding = embedding.ok_or(RejectReason::MissingEmbedding)?;
    let got = embedding.len();
    match dim {
        Some(expected) if got != expected => {
            return Err(RejectReason::EmbeddingDimension { expected, got });
        }
        None if got == 0 => {
            return Err(RejectReason::EmbeddingDimension { expected: 0, got });
        }
        _ => {}
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(RejectReason::NonFiniteEmbedding);
    }
    l2_normalize(embedding).ok_or(RejectReason::ZeroNormEmbedding)
}
