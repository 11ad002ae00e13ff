//! Distance, similarity and head-pose helpers.

use nalgebra::Point2;
use ndarray::{Array1, ArrayView1};

/// Image-space point in pixels.
pub type Point = Point2<f32>;

/// Euclidean distance between two centroids.
#[inline]
pub fn centroid_distance(a: &Point, b: &Point) -> f32 {
    nalgebra::distance(a, b)
}

/// Cosine similarity of two unit-length embeddings.
///
/// Both vectors must already be L2-normalised, so this is the dot product.
#[inline]
pub fn cosine_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.dot(&b)
}

/// Scale `v` to unit length. Returns `None` for a zero or non-finite norm.
pub fn l2_normalize(v: &Array1<f32>) -> Option<Array1<f32>> {
    let norm = v.dot(v).sqrt();
    if !norm.is_finite() || norm <= f32::EPSILON {
        return None;
    }
    Some(v / norm)
}

/// Yaw and pitch ratios describing how far a face is turned from the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub yaw_ratio: f32,
    pub pitch_ratio: f32,
}

/// The 5-point landmark set produced by SCRFD-style detectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceLandmarks {
    pub left_eye: Point,
    pub right_eye: Point,
    pub nose: Point,
    pub mouth_left: Point,
    pub mouth_right: Point,
}

impl FaceLandmarks {
    /// Build from `[left_eye, right_eye, nose, mouth_left, mouth_right]`.
    pub fn from_points(points: [(f32, f32); 5]) -> Self {
        let [le, re, nose, ml, mr] = points.map(|(x, y)| Point::new(x, y));
        Self {
            left_eye: le,
            right_eye: re,
            nose,
            mouth_left: ml,
            mouth_right: mr,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.left_eye,
            self.right_eye,
            self.nose,
            self.mouth_left,
            self.mouth_right,
        ]
        .iter()
        .all(|p| p.x.is_finite() && p.y.is_finite())
    }

    /// Yaw ratio: horizontal nose offset from the eye midpoint over eye distance.
    /// Pitch ratio: vertical nose offset from the eye line over eye-to-mouth height.
    pub fn head_pose(&self) -> HeadPose {
        let eye_mid_x = (self.left_eye.x + self.right_eye.x) / 2.0;
        let eye_dist = (self.left_eye.x - self.right_eye.x).abs();
        let yaw_ratio = if eye_dist > 0.0 {
            (self.nose.x - eye_mid_x).abs() / eye_dist
        } else {
            1.0
        };

        let eye_mid_y = (self.left_eye.y + self.right_eye.y) / 2.0;
        let mouth_mid_y = (self.mouth_left.y + self.mouth_right.y) / 2.0;
        let pitch_ratio = (self.nose.y - eye_mid_y).abs() / (mouth_mid_y - eye_mid_y + 1e-6);

        HeadPose {
            yaw_ratio,
            pitch_ratio,
        }
    }
}
