//! Hands final results of finished sessions to an external collaborator.
//!
//! The engine does not know how results are persisted; a [`ResultSink`]
//! implementation does (an HTTP client patching the match record, a queue
//! producer, a test recorder). The reporter listens to a session feed and
//! submits one [`FinalResult`] each time the session enters `Finished`.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time::sleep,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::RetryPolicy,
    error::ReportError,
    services::live_session::LiveSession,
    state::{ContestantIdentity, FinishReason, SessionSnapshot, Side, Sides},
};

/// Abstraction over whatever records final match results.
pub trait ResultSink: Send + Sync {
    /// Record `result`. Implementations should be idempotent on
    /// `(session_id, version)` since a retry may follow a timeout.
    fn submit(&self, result: FinalResult) -> BoxFuture<'static, Result<(), ReportError>>;
}

/// Final tally of one contestant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContestantResult {
    /// Who played.
    pub identity: ContestantIdentity,
    /// Final points.
    pub points: u32,
    /// Final fouls.
    pub fouls: u32,
}

/// Result record produced when a session finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalResult {
    /// Session that produced the result.
    pub session_id: Uuid,
    /// Snapshot version the result was taken from.
    pub version: u64,
    /// Home contestant.
    pub home: ContestantResult,
    /// Away contestant.
    pub away: ContestantResult,
    /// Time left on the clock (non-zero for early finishes).
    pub remaining_seconds: u32,
    /// Whether the clock ran out or an official ended the match.
    pub reason: FinishReason,
}

impl FinalResult {
    /// Build a result from a finishing snapshot; `None` for any other snapshot.
    pub fn from_snapshot(
        session_id: Uuid,
        identities: &Sides<ContestantIdentity>,
        snapshot: &SessionSnapshot,
    ) -> Option<Self> {
        if !snapshot.is_finish() {
            return None;
        }
        let reason = snapshot.finish_reason?;
        let side = |side: Side| {
            let score = snapshot.score(side);
            ContestantResult {
                identity: identities.get(side).clone(),
                points: score.points,
                fouls: score.fouls,
            }
        };

        Some(Self {
            session_id,
            version: snapshot.version,
            home: side(Side::Home),
            away: side(Side::Away),
            remaining_seconds: snapshot.clock.remaining_seconds,
            reason,
        })
    }

    /// Contestant with more points, or `None` for a draw.
    pub fn winner(&self) -> Option<Side> {
        match self.home.points.cmp(&self.away.points) {
            std::cmp::Ordering::Greater => Some(Side::Home),
            std::cmp::Ordering::Less => Some(Side::Away),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Start reporting results of `session` to `sink`.
///
/// The subscription is taken before this function returns, so no finish that
/// happens afterwards can be missed. The task ends once the session is dropped.
pub fn spawn_result_reporter(
    session: &LiveSession,
    sink: Arc<dyn ResultSink>,
    policy: RetryPolicy,
) -> JoinHandle<()> {
    let receiver = session.subscribe();
    let session_id = session.id();
    let identities = session.identities().clone();

    tokio::spawn(run(receiver, session_id, identities, sink, policy))
}

async fn run(
    mut receiver: broadcast::Receiver<SessionSnapshot>,
    session_id: Uuid,
    identities: Sides<ContestantIdentity>,
    sink: Arc<dyn ResultSink>,
    policy: RetryPolicy,
) {
    loop {
        let snapshot = match receiver.recv().await {
            Ok(snapshot) => snapshot,
            Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(skipped)) => {
                warn!(%session_id, skipped, "result reporter lagged behind the feed");
                continue;
            }
        };

        if let Some(result) = FinalResult::from_snapshot(session_id, &identities, &snapshot) {
            submit_with_retry(sink.as_ref(), result, policy).await;
        }
    }
}

/// Submit `result`, retrying retryable failures with exponential backoff.
/// Returns whether the sink accepted the result.
pub async fn submit_with_retry(
    sink: &dyn ResultSink,
    result: FinalResult,
    policy: RetryPolicy,
) -> bool {
    let session_id = result.session_id;
    let mut attempt = 0;

    loop {
        match sink.submit(result.clone()).await {
            Ok(()) => {
                info!(
                    %session_id,
                    home = result.home.points,
                    away = result.away.points,
                    reason = ?result.reason,
                    "final result reported"
                );
                return true;
            }
            Err(err) if err.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    %session_id,
                    attempt,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "result submission failed; retrying"
                );
                attempt += 1;
                sleep(delay).await;
            }
            Err(err) => {
                error!(%session_id, attempt, error = %err, "giving up on result submission");
                return false;
            }
        }
    }
}
