//! Async handle around a [`ScoreSession`].
//!
//! Commands and clock ticks are serialized through one mutex and every
//! snapshot is published while that mutex is held, so subscribers observe
//! snapshots in the order they were accepted. The clock is driven by a spawned
//! task that only holds a weak reference to the session; the task is aborted
//! whenever the session stops running and when the last handle is dropped.

use std::{
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    sync::{Mutex, broadcast},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    error::SessionError,
    state::{
        Command, CommandResult, ContestantIdentity, ScoreSession, SessionDescriptor,
        SessionPhase, SessionSnapshot, Side, Sides, SnapshotHub,
    },
};

/// Cloneable handle to a running scoring session.
#[derive(Clone)]
pub struct LiveSession {
    inner: Arc<LiveInner>,
}

impl fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.inner.id)
            .field("identities", &self.inner.identities)
            .finish_non_exhaustive()
    }
}

struct LiveInner {
    id: Uuid,
    identities: Sides<ContestantIdentity>,
    core: Mutex<Core>,
    hub: SnapshotHub,
    tick_period: Duration,
}

struct Core {
    session: ScoreSession,
    ticker: Option<Ticker>,
    next_epoch: u64,
}

struct Ticker {
    epoch: u64,
    handle: JoinHandle<()>,
}

impl LiveSession {
    /// Build a live session; the clock does not tick until `start`.
    pub fn new(descriptor: SessionDescriptor, config: &EngineConfig) -> Result<Self, SessionError> {
        let session = ScoreSession::new(descriptor)?;
        let id = Uuid::new_v4();
        debug!(session_id = %id, phase = ?session.phase(), "live session created");

        Ok(Self {
            inner: Arc::new(LiveInner {
                id,
                identities: session.identities().clone(),
                core: Mutex::new(Core {
                    session,
                    ticker: None,
                    next_epoch: 0,
                }),
                hub: SnapshotHub::new(config.feed_capacity),
                tick_period: config.tick_period,
            }),
        })
    }

    /// Identifier of this session.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Contestants of this session.
    pub fn identities(&self) -> &Sides<ContestantIdentity> {
        &self.inner.identities
    }

    /// Current state without emitting anything.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.core.lock().await.session.snapshot()
    }

    /// Receive every snapshot emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.inner.hub.subscribe()
    }

    /// Same as [`LiveSession::subscribe`], as a `Stream`.
    pub fn stream(&self) -> BroadcastStream<SessionSnapshot> {
        self.inner.hub.stream()
    }

    /// Current snapshot together with a stream of every later one.
    ///
    /// Both are taken under the session lock, so the stream neither repeats
    /// the returned snapshot nor misses anything published after it.
    pub async fn watch(&self) -> (SessionSnapshot, BroadcastStream<SessionSnapshot>) {
        let core = self.inner.core.lock().await;
        (core.session.snapshot(), self.inner.hub.stream())
    }

    /// Whether a tick task is currently scheduled.
    pub async fn is_ticking(&self) -> bool {
        self.inner.core.lock().await.ticker.is_some()
    }

    /// See [`ScoreSession::configure`].
    pub async fn configure(&self, duration_seconds: u32) -> CommandResult {
        self.run(Command::Configure, |session| session.configure(duration_seconds))
            .await
    }

    /// See [`ScoreSession::start`]. Schedules the tick task.
    pub async fn start(&self) -> CommandResult {
        self.run(Command::Start, ScoreSession::start).await
    }

    /// See [`ScoreSession::pause`]. Cancels the tick task.
    pub async fn pause(&self) -> CommandResult {
        self.run(Command::Pause, ScoreSession::pause).await
    }

    /// See [`ScoreSession::reset`]. Cancels the tick task.
    pub async fn reset(&self, duration_seconds: u32) -> CommandResult {
        self.run(Command::Reset, |session| session.reset(duration_seconds))
            .await
    }

    /// See [`ScoreSession::finalize`]. Cancels the tick task.
    pub async fn finalize(&self) -> CommandResult {
        self.run(Command::Finalize, ScoreSession::finalize).await
    }

    /// See [`ScoreSession::select_scorer`].
    pub async fn select_scorer(&self, side: Side) -> CommandResult {
        self.run(Command::SelectScorer, |session| session.select_scorer(side))
            .await
    }

    /// See [`ScoreSession::clear_selection`].
    pub async fn clear_selection(&self) -> CommandResult {
        self.run(Command::ClearSelection, ScoreSession::clear_selection)
            .await
    }

    /// See [`ScoreSession::add_points`].
    pub async fn add_points(&self, delta: i32) -> CommandResult {
        self.run(Command::AddPoints, |session| session.add_points(delta))
            .await
    }

    /// See [`ScoreSession::add_foul`].
    pub async fn add_foul(&self) -> CommandResult {
        self.run(Command::AddFoul, ScoreSession::add_foul).await
    }

    /// Apply `command` under the session lock, then publish and resync the
    /// ticker before releasing it.
    async fn run<F>(&self, command: Command, apply: F) -> CommandResult
    where
        F: FnOnce(&mut ScoreSession) -> CommandResult,
    {
        let mut core = self.inner.core.lock().await;
        let outcome = apply(&mut core.session);

        match &outcome {
            Ok(Some(snapshot)) => {
                debug!(
                    session_id = %self.inner.id,
                    ?command,
                    phase = ?snapshot.phase,
                    version = snapshot.version,
                    subscribers = self.inner.hub.subscriber_count(),
                    "command applied"
                );
                LiveInner::sync_ticker(&self.inner, &mut core);
                self.inner.hub.broadcast(snapshot.clone());
            }
            Ok(None) => {
                debug!(session_id = %self.inner.id, ?command, "command was a no-op");
            }
            Err(err) => {
                debug!(session_id = %self.inner.id, ?command, error = %err, "command rejected");
            }
        }

        outcome
    }
}

impl LiveInner {
    /// Make the tick task match the phase: one task while running, none otherwise.
    fn sync_ticker(inner: &Arc<Self>, core: &mut Core) {
        let running = core.session.phase() == SessionPhase::Running;
        match (running, core.ticker.is_some()) {
            (true, false) => {
                let epoch = core.next_epoch;
                core.next_epoch += 1;
                let handle = Self::spawn_ticker(inner, epoch);
                core.ticker = Some(Ticker { epoch, handle });
            }
            (false, true) => {
                if let Some(ticker) = core.ticker.take() {
                    ticker.handle.abort();
                }
            }
            _ => {}
        }
    }

    fn spawn_ticker(inner: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(inner);
        let period = inner.tick_period;
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let Some(inner) = weak.upgrade() else {
                    break;
                };

                if !inner.on_tick(epoch).await {
                    break;
                }
            }
        })
    }

    /// Apply one tick if `epoch` still owns the clock. Returns whether the
    /// task should keep ticking.
    async fn on_tick(&self, epoch: u64) -> bool {
        let mut core = self.core.lock().await;
        if core.ticker.as_ref().map(|ticker| ticker.epoch) != Some(epoch) {
            return false;
        }

        let Some(snapshot) = core.session.tick() else {
            core.ticker = None;
            return false;
        };

        let finished = snapshot.phase == SessionPhase::Finished;
        if finished {
            info!(
                session_id = %self.id,
                home = snapshot.home.points,
                away = snapshot.away.points,
                "match clock expired"
            );
            // Dropping our own handle detaches the task; the loop exits below.
            core.ticker = None;
        }
        self.hub.broadcast(snapshot);

        !finished
    }
}

impl Drop for LiveInner {
    fn drop(&mut self) {
        if let Some(ticker) = self.core.get_mut().ticker.take() {
            ticker.handle.abort();
        }
        debug!(session_id = %self.id, "live session dropped");
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::time::sleep;

    use super::*;
    use crate::state::{FinishReason, SnapshotCause};

    fn descriptor(duration: u32) -> SessionDescriptor {
        SessionDescriptor::new(
            ContestantIdentity::player("p-ada", "Ada"),
            ContestantIdentity::player("p-bo", "Bo"),
        )
        .unwrap()
        .with_duration(duration)
    }

    fn live(duration: u32) -> LiveSession {
        LiveSession::new(descriptor(duration), &EngineConfig::default()).unwrap()
    }

    fn drain(receiver: &mut broadcast::Receiver<SessionSnapshot>) -> Vec<SessionSnapshot> {
        let mut out = Vec::new();
        while let Ok(snapshot) = receiver.try_recv() {
            out.push(snapshot);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn clock_counts_down_to_finished() {
        let session = live(10);
        let mut feed = session.subscribe();

        session.start().await.unwrap();
        sleep(Duration::from_millis(10_500)).await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Finished);
        assert_eq!(snapshot.clock.remaining_seconds, 0);
        assert!(!snapshot.clock.is_running);
        assert_eq!(snapshot.finish_reason, Some(FinishReason::Expired));
        assert!(!session.is_ticking().await);

        let snapshots = drain(&mut feed);
        assert_eq!(snapshots.len(), 11);
        assert_eq!(snapshots[0].cause, SnapshotCause::Command(Command::Start));
        let expiries = snapshots
            .iter()
            .filter(|snapshot| snapshot.cause == SnapshotCause::Expired)
            .count();
        assert_eq!(expiries, 1);

        sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut feed).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticks_and_resume_keeps_time() {
        let session = live(10);
        session.start().await.unwrap();
        sleep(Duration::from_millis(3_500)).await;

        session.pause().await.unwrap();
        assert_eq!(session.snapshot().await.clock.remaining_seconds, 7);
        assert!(!session.is_ticking().await);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(session.snapshot().await.clock.remaining_seconds, 7);

        assert_eq!(session.pause().await, Ok(None));

        session.start().await.unwrap();
        assert_eq!(session.snapshot().await.clock.remaining_seconds, 7);
        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(session.snapshot().await.clock.remaining_seconds, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_follow_command_order() {
        let session = live(60);
        let mut feed = session.subscribe();

        session.start().await.unwrap();
        session.select_scorer(Side::Home).await.unwrap();
        session.add_points(3).await.unwrap();
        session.select_scorer(Side::Away).await.unwrap();
        session.add_foul().await.unwrap();
        session.pause().await.unwrap();

        let snapshots = drain(&mut feed);
        let causes: Vec<_> = snapshots.iter().map(|snapshot| snapshot.cause).collect();
        assert_eq!(
            causes,
            vec![
                SnapshotCause::Command(Command::Start),
                SnapshotCause::Command(Command::SelectScorer),
                SnapshotCause::Command(Command::AddPoints),
                SnapshotCause::Command(Command::SelectScorer),
                SnapshotCause::Command(Command::AddFoul),
                SnapshotCause::Command(Command::Pause),
            ]
        );
        assert!(
            snapshots
                .windows(2)
                .all(|pair| pair[0].version < pair[1].version)
        );
        let last = snapshots.last().unwrap();
        assert_eq!(last.home.points, 3);
        assert_eq!(last.away.fouls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_and_no_op_commands_emit_nothing() {
        let session = live(60);
        let mut feed = session.subscribe();

        assert_eq!(session.add_foul().await, Err(SessionError::NoScorerSelected));
        assert_eq!(
            session.pause().await,
            Err(SessionError::InvalidState {
                phase: SessionPhase::Ready,
                command: Command::Pause
            })
        );
        assert_eq!(session.configure(0).await, Err(SessionError::InvalidDuration(0)));
        session.start().await.unwrap();
        assert_eq!(session.start().await, Ok(None));

        assert_eq!(drain(&mut feed).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn finalize_cancels_the_ticker() {
        let session = live(60);
        session.start().await.unwrap();
        sleep(Duration::from_millis(2_500)).await;

        let finished = session.finalize().await.unwrap().unwrap();
        assert_eq!(finished.clock.remaining_seconds, 58);
        assert!(!session.is_ticking().await);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(session.snapshot().await, finished);
        assert_eq!(session.add_points(1).await, Err(SessionError::SessionFinished));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_the_ticker_and_rearms() {
        let session = live(60);
        session.start().await.unwrap();
        session.select_scorer(Side::Away).await.unwrap();
        session.add_points(2).await.unwrap();
        sleep(Duration::from_millis(1_500)).await;

        let snapshot = session.reset(30).await.unwrap().unwrap();
        assert_eq!(snapshot.phase, SessionPhase::Ready);
        assert_eq!(snapshot.clock.remaining_seconds, 30);
        assert_eq!(snapshot.away.points, 0);

        sleep(Duration::from_secs(3)).await;
        assert_eq!(session.snapshot().await.clock.remaining_seconds, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_last_handle_stops_the_clock() {
        let session = live(60);
        let mut feed = session.subscribe();
        session.start().await.unwrap();
        sleep(Duration::from_millis(1_500)).await;
        drop(session);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(drain(&mut feed).len(), 2);
        assert!(matches!(feed.try_recv(), Err(TryRecvError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn stream_yields_snapshots() {
        use futures::StreamExt;

        let session = live(60);
        let mut stream = session.stream();
        session.start().await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.cause, SnapshotCause::Command(Command::Start));
        let tick = stream.next().await.unwrap().unwrap();
        assert_eq!(tick.cause, SnapshotCause::Tick);
        assert_eq!(tick.clock.remaining_seconds, 59);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_starts_from_the_current_snapshot() {
        use futures::StreamExt;

        let session = live(60);
        session.start().await.unwrap();

        let (current, mut stream) = session.watch().await;
        assert_eq!(current.version, 1);
        assert_eq!(current.phase, SessionPhase::Running);

        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next.version, 2);
        assert_eq!(next.cause, SnapshotCause::Tick);
    }

    #[test]
    fn debug_shows_the_session_id() {
        let session = live(60);
        let rendered = format!("{session:?}");
        assert!(rendered.contains(&session.id().to_string()));
    }
}
