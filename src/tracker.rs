mod attention;
mod engine;
mod gallery;
mod geometry;
mod lifecycle;
mod matchers;
mod matching;
mod observation;
mod rect;
mod track;
mod track_state;

pub use attention::{FrontalGate, credit};
pub use engine::{AttentionEngine, EngineConfig, FrameOutcome, REFERENCE_FRAME_WIDTH, TrackSnapshot};
pub use gallery::{IdentityGallery, ReferenceUpdate, validate_embedding};
pub use geometry::{FaceLandmarks, HeadPose, Point, centroid_distance, cosine_similarity, l2_normalize};
pub use lifecycle::{MatchKind, TrackRegistry};
pub use matchers::{EmbeddingMatcher, SpatialMatcher};
pub use matching::{
    AssignmentResult, AssignmentSolver, MatchOutcome, MatchStrategy, Matcher, ScoreOrder,
    distance_matrix, greedy_assignment, linear_assignment, similarity_matrix,
};
pub use observation::{Observation, RejectReason, Rejection};
pub use rect::Rect;
pub use track::Track;
pub use track_state::TrackState;
