//! Per-frame face observations and per-observation rejection signals.

use ndarray::Array1;
use thiserror::Error;

use crate::tracker::geometry::{FaceLandmarks, HeadPose, Point};
use crate::tracker::rect::Rect;

/// One detected face in one frame.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Face bounding box in pixels
    pub bbox: Rect,
    /// Face centroid in pixels
    pub centroid: Point,
    /// Optional 5-point landmark set
    pub landmarks: Option<FaceLandmarks>,
    /// Optional identity embedding, expected to be unit length
    pub embedding: Option<Array1<f32>>,
    /// Frontal flag precomputed by the detector
    pub frontal: Option<bool>,
    /// Yaw/pitch ratios precomputed by the detector
    pub head_pose: Option<HeadPose>,
}

impl Observation {
    /// Create an observation whose centroid is the center of `bbox`.
    pub fn new(bbox: Rect) -> Self {
        let (cx, cy) = bbox.center();
        Self {
            bbox,
            centroid: Point::new(cx, cy),
            landmarks: None,
            embedding: None,
            frontal: None,
            head_pose: None,
        }
    }

    /// Create a point observation with an empty box at `(cx, cy)`.
    pub fn at(cx: f32, cy: f32) -> Self {
        Self::new(Rect::from_center(cx, cy, 0.0, 0.0))
    }

    pub fn with_frontal(mut self, frontal: bool) -> Self {
        self.frontal = Some(frontal);
        self
    }

    pub fn with_embedding(mut self, embedding: Array1<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    pub fn with_head_pose(mut self, yaw_ratio: f32, pitch_ratio: f32) -> Self {
        self.head_pose = Some(HeadPose {
            yaw_ratio,
            pitch_ratio,
        });
        self
    }

    #[inline]
    pub fn has_finite_centroid(&self) -> bool {
        self.centroid.x.is_finite() && self.centroid.y.is_finite()
    }
}

/// Why an observation was excluded from matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("centroid is not finite")]
    NonFiniteCentroid,
    #[error("observation carries no embedding")]
    MissingEmbedding,
    #[error("embedding has {got} dimensions, expected {expected}")]
    EmbeddingDimension { expected: usize, got: usize },
    #[error("embedding contains non-finite values")]
    NonFiniteEmbedding,
    #[error("embedding has zero norm")]
    ZeroNormEmbedding,
}

/// Diagnostic emitted for an observation that could not be matched normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Index of the observation in the frame batch
    pub index: usize,
    pub reason: RejectReason,
}
