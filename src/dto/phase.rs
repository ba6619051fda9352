use serde::Serialize;

use crate::state::SessionPhase;

/// Session phase as exposed to presentation layers.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// Waiting for a duration.
    Configuring,
    /// Armed, clock not yet started.
    Ready,
    /// Clock counting down.
    Running,
    /// Clock stopped mid-match.
    Paused,
    /// Match over, scores frozen.
    Finished,
}

impl From<SessionPhase> for VisiblePhase {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Configuring => VisiblePhase::Configuring,
            SessionPhase::Ready => VisiblePhase::Ready,
            SessionPhase::Running => VisiblePhase::Running,
            SessionPhase::Paused => VisiblePhase::Paused,
            SessionPhase::Finished => VisiblePhase::Finished,
        }
    }
}
