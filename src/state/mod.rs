//! Pure session state: contestants, the match clock, the phase table and the
//! scoring aggregate, plus the hub snapshots are published through.

pub mod clock;
pub mod contestant;
mod feed;
pub mod session;
pub mod state_machine;

pub use self::clock::{ClockState, MatchClock};
pub use self::contestant::{ContestantIdentity, ContestantScore, Side, Sides};
pub use self::feed::SnapshotHub;
pub use self::session::{
    Command, CommandResult, ScoreSession, SessionDescriptor, SessionSnapshot, SnapshotCause,
};
pub use self::state_machine::{FinishReason, SessionPhase};
