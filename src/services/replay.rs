//! Scripted officiating: a JSON document describing a match and the sequence
//! of commands an official issued, replayed against a live session.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    dto::descriptor::SessionDescriptorInput,
    error::SessionError,
    services::live_session::LiveSession,
    state::{CommandResult, Side},
};

/// A match description plus the commands to replay against it.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    pub session: SessionDescriptorInput,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
}

/// One scripted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ReplayStep {
    Configure { duration_seconds: u32 },
    Start,
    Pause,
    Reset { duration_seconds: u32 },
    Finalize,
    SelectScorer { side: Side },
    ClearSelection,
    AddPoints { delta: i32 },
    AddFoul,
    /// Let the clock run for a while.
    Wait { millis: u64 },
}

/// Tally of a replay run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplayReport {
    /// Steps that produced a snapshot.
    pub applied: usize,
    /// Steps accepted without any state change.
    pub no_ops: usize,
    /// Rejected steps with their zero-based index.
    pub rejected: Vec<(usize, SessionError)>,
}

impl ReplayScript {
    /// Parse a script from JSON.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}

/// Replay `steps` in order. Rejected commands are logged and recorded; the
/// replay carries on with the next step.
pub async fn replay(session: &LiveSession, steps: &[ReplayStep]) -> ReplayReport {
    let mut report = ReplayReport::default();

    for (index, step) in steps.iter().copied().enumerate() {
        let outcome = match step {
            ReplayStep::Wait { millis } => {
                sleep(Duration::from_millis(millis)).await;
                continue;
            }
            step => apply(session, step).await,
        };

        match outcome {
            Ok(Some(snapshot)) => {
                debug!(session_id = %session.id(), index, version = snapshot.version, "step applied");
                report.applied += 1;
            }
            Ok(None) => report.no_ops += 1,
            Err(err) => {
                warn!(session_id = %session.id(), index, ?step, error = %err, "step rejected");
                report.rejected.push((index, err));
            }
        }
    }

    report
}

async fn apply(session: &LiveSession, step: ReplayStep) -> CommandResult {
    match step {
        ReplayStep::Configure { duration_seconds } => session.configure(duration_seconds).await,
        ReplayStep::Start => session.start().await,
        ReplayStep::Pause => session.pause().await,
        ReplayStep::Reset { duration_seconds } => session.reset(duration_seconds).await,
        ReplayStep::Finalize => session.finalize().await,
        ReplayStep::SelectScorer { side } => session.select_scorer(side).await,
        ReplayStep::ClearSelection => session.clear_selection().await,
        ReplayStep::AddPoints { delta } => session.add_points(delta).await,
        ReplayStep::AddFoul => session.add_foul().await,
        ReplayStep::Wait { .. } => Ok(None),
    }
}
