/// Lifecycle state of a tracked identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Matched within the staleness window
    Active,
    /// Unmatched for longer than the stale timeout; kept for reporting
    Evicted,
}
