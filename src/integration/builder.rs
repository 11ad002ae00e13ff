//! Builder for creating Observation objects from various input formats.

use ndarray::Array1;

use crate::tracker::{FaceLandmarks, Observation, Rect};

/// Builder for `Observation`s from detector output.
#[derive(Debug, Clone, Default)]
pub struct ObservationBuilder {
    bbox: Rect,
    landmarks: Option<[(f32, f32); 5]>,
    embedding: Option<Vec<f32>>,
    frontal: Option<bool>,
    head_pose: Option<(f32, f32)>,
}

impl ObservationBuilder {
    /// Create a new observation builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::from_center(cx, cy, w, h);
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(x, y, w, h);
        self
    }

    /// Set the 5 landmarks: left eye, right eye, nose, left and right mouth corner.
    pub fn landmarks(mut self, points: [(f32, f32); 5]) -> Self {
        self.landmarks = Some(points);
        self
    }

    pub fn embedding(mut self, embedding: impl Into<Vec<f32>>) -> Self {
        self.embedding = Some(embedding.into());
        self
    }

    pub fn frontal(mut self, frontal: bool) -> Self {
        self.frontal = Some(frontal);
        self
    }

    pub fn head_pose(mut self, yaw_ratio: f32, pitch_ratio: f32) -> Self {
        self.head_pose = Some((yaw_ratio, pitch_ratio));
        self
    }

    /// Build the final `Observation`. The centroid is the box center.
    pub fn build(self) -> Observation {
        let mut observation = Observation::new(self.bbox);
        observation.landmarks = self.landmarks.map(FaceLandmarks::from_points);
        observation.embedding = self.embedding.map(Array1::from_vec);
        observation.frontal = self.frontal;
        if let Some((yaw, pitch)) = self.head_pose {
            observation = observation.with_head_pose(yaw, pitch);
        }
        observation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_builder() {
        let obs = ObservationBuilder::new()
            .tlbr(10.0, 20.0, 50.0, 80.0)
            .embedding(vec![1.0f32, 0.0])
            .frontal(true)
            .build();

        assert_eq!(obs.centroid.x, 30.0);
        assert_eq!(obs.centroid.y, 50.0);
        assert_eq!(obs.frontal, Some(true));
        assert_eq!(obs.embedding.map(|e| e.len()), Some(2));
    }

    #[test]
    fn test_box_formats_agree() {
        let a = ObservationBuilder::new().tlbr(10.0, 20.0, 50.0, 80.0).build();
        let b = ObservationBuilder::new().xywh(30.0, 50.0, 40.0, 60.0).build();
        let c = ObservationBuilder::new().tlwh(10.0, 20.0, 40.0, 60.0).build();
        assert_eq!(a.bbox, b.bbox);
        assert_eq!(a.bbox, c.bbox);
    }

    #[test]
    fn test_pose_inputs() {
        let obs = ObservationBuilder::new()
            .landmarks([(0.0, 0.0); 5])
            .head_pose(0.1, 0.2)
            .build();
        assert!(obs.landmarks.is_some());
        assert_eq!(obs.head_pose.map(|p| p.yaw_ratio), Some(0.1));
    }
}
