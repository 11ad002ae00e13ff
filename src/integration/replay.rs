//! JSON-lines observation logs, one frame per line.
//!
//! ```text
//! {"time": 0.0, "observations": [{"bbox": [80, 120, 120, 180], "frontal": true}]}
//! {"time": 0.033, "observations": []}
//! ```

use std::io::{BufRead, Lines};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::integration::ObservationBuilder;
use crate::tracker::Observation;

/// One face as written by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayObservation {
    /// Box in TLBR format
    pub bbox: [f32; 4],
    /// `[left_eye, right_eye, nose, mouth_left, mouth_right]` as `[x, y]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<[[f32; 2]; 5]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaw_ratio: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_ratio: Option<f32>,
}

impl ReplayObservation {
    pub fn to_observation(&self) -> Observation {
        let [x1, y1, x2, y2] = self.bbox;
        let mut builder = ObservationBuilder::new().tlbr(x1, y1, x2, y2);
        if let Some(points) = self.landmarks {
            builder = builder.landmarks(points.map(|[x, y]| (x, y)));
        }
        if let Some(embedding) = &self.embedding {
            builder = builder.embedding(embedding.clone());
        }
        if let Some(frontal) = self.frontal {
            builder = builder.frontal(frontal);
        }
        if let (Some(yaw), Some(pitch)) = (self.yaw_ratio, self.pitch_ratio) {
            builder = builder.head_pose(yaw, pitch);
        }
        builder.build()
    }
}

/// All faces of one frame, stamped with the capture time in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub time: f64,
    #[serde(default)]
    pub observations: Vec<ReplayObservation>,
}

impl ReplayFrame {
    pub fn observations(&self) -> Vec<Observation> {
        self.observations
            .iter()
            .map(ReplayObservation::to_observation)
            .collect()
    }
}

/// Iterates the frames of a JSON-lines log, skipping blank lines.
pub struct ReplayReader<R> {
    lines: Lines<R>,
}

impl<R: BufRead> ReplayReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> Iterator for ReplayReader<R> {
    type Item = Result<ReplayFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(Into::into));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_frames() {
        let log = r#"{"time": 0.0, "observations": [{"bbox": [80, 120, 120, 180], "frontal": true}]}

{"time": 0.5}
"#;
        let frames: Vec<ReplayFrame> = ReplayReader::new(log.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].time, 0.5);
        assert!(frames[1].observations.is_empty());

        let obs = frames[0].observations();
        assert_eq!(obs[0].centroid.x, 100.0);
        assert_eq!(obs[0].centroid.y, 150.0);
        assert_eq!(obs[0].frontal, Some(true));
    }

    #[test]
    fn test_invalid_line_is_an_error() {
        let mut reader = ReplayReader::new("not json\n".as_bytes());
        assert!(matches!(reader.next(), Some(Err(crate::Error::Json(_)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_pose_fields() {
        let frame: ReplayFrame = serde_json::from_str(
            r#"{"time": 1.0, "observations": [{"bbox": [0, 0, 10, 10],
                "landmarks": [[2, 3], [8, 3], [5, 5], [3, 8], [7, 8]],
                "yaw_ratio": 0.1, "pitch_ratio": 0.3,
                "embedding": [0.0, 1.0]}]}"#,
        )
        .unwrap();
        let obs = frame.observations();
        assert!(obs[0].landmarks.is_some());
        assert!(obs[0].head_pose.is_some());
        assert_eq!(obs[0].embedding.as_ref().map(|e| e.len()), Some(2));
    }
}
