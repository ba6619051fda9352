use std::time::SystemTime;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    dto::{format_system_time, phase::VisiblePhase},
    state::{
        ClockState, Command, ContestantIdentity, FinishReason, SessionSnapshot, Side, Sides,
        SnapshotCause,
    },
};

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
/// Wire representation of a [`SessionSnapshot`].
pub struct SnapshotDto {
    pub session_id: Uuid,
    pub version: u64,
    pub phase: VisiblePhase,
    pub cause: CauseDto,
    pub clock: ClockDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured_seconds: Option<u32>,
    pub home: ContestantDto,
    pub away: ContestantDto,
    pub selection: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// RFC 3339 timestamp of when the DTO was built.
    pub emitted_at: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// What produced the snapshot.
pub enum CauseDto {
    Created,
    Command { command: Command },
    Tick,
    Expired,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
/// Clock values plus a `MM:SS` rendering for scoreboards.
pub struct ClockDto {
    pub remaining_seconds: u32,
    pub is_running: bool,
    pub display: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
/// Contestant identity and tally.
pub struct ContestantDto {
    #[serde(flatten)]
    pub identity: ContestantIdentity,
    pub points: u32,
    pub fouls: u32,
    pub selected: bool,
}

impl From<SnapshotCause> for CauseDto {
    fn from(value: SnapshotCause) -> Self {
        match value {
            SnapshotCause::Created => CauseDto::Created,
            SnapshotCause::Command(command) => CauseDto::Command { command },
            SnapshotCause::Tick => CauseDto::Tick,
            SnapshotCause::Expired => CauseDto::Expired,
        }
    }
}

impl From<ClockState> for ClockDto {
    fn from(value: ClockState) -> Self {
        let minutes = value.remaining_seconds / 60;
        let seconds = value.remaining_seconds % 60;
        Self {
            remaining_seconds: value.remaining_seconds,
            is_running: value.is_running,
            display: format!("{minutes:02}:{seconds:02}"),
        }
    }
}

impl SnapshotDto {
    /// Build the DTO for `snapshot` of session `session_id`.
    pub fn new(
        session_id: Uuid,
        identities: &Sides<ContestantIdentity>,
        snapshot: &SessionSnapshot,
        emitted_at: SystemTime,
    ) -> Self {
        let contestant = |side: Side| {
            let score = snapshot.score(side);
            ContestantDto {
                identity: identities.get(side).clone(),
                points: score.points,
                fouls: score.fouls,
                selected: snapshot.selection == Some(side),
            }
        };

        Self {
            session_id,
            version: snapshot.version,
            phase: snapshot.phase.into(),
            cause: snapshot.cause.into(),
            clock: snapshot.clock.into(),
            configured_seconds: snapshot.configured_seconds,
            home: contestant(Side::Home),
            away: contestant(Side::Away),
            selection: snapshot.selection,
            finish_reason: snapshot.finish_reason,
            emitted_at: format_system_time(emitted_at),
        }
    }
}
