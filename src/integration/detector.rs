//! Trait for face detection backends.

use crate::tracker::Observation;

/// Trait for face detection backends.
///
/// Implement this trait to feed any detector/embedding model into the
/// attention engine. Backends decide how frontal-ness is reported: as a
/// flag, as yaw/pitch ratios, or through landmarks.
///
/// # Example
///
/// ```ignore
/// use gazetally::{ObservationSource, Observation};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl ObservationSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &[u8], width: u32, height: u32) -> Result<Vec<Observation>, Self::Error> {
///         // Run detection, landmarks and embedding extraction
///         Ok(vec![])
///     }
/// }
/// ```
pub trait ObservationSource {
    /// Error type for detection failures.
    type Error;

    /// Run detection on raw frame data and return one observation per face.
    fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Observation>, Self::Error>;
}

