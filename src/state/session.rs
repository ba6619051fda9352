//! Scoring session aggregate: two contestants, a match clock, the scorer
//! selection and the lifecycle phase.
//!
//! Every command either applies completely and returns exactly one snapshot,
//! or fails and leaves the session untouched. Accepted no-ops (starting a
//! running clock, pausing a paused one, re-selecting the selected side) succeed
//! with `Ok(None)`.

use tracing::warn;

use crate::{
    error::{DescriptorError, SessionError},
    state::{
        clock::{ClockError, ClockState, MatchClock, Tick},
        contestant::{ContestantIdentity, ContestantScore, Side, Sides},
        state_machine::{
            FinishReason, InvalidTransition, Plan, SessionEvent, SessionPhase, SessionStateMachine,
        },
    },
};

/// Outcome of a session command.
pub type CommandResult = Result<Option<SessionSnapshot>, SessionError>;

/// Commands accepted by a [`ScoreSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Set the match duration.
    Configure,
    /// Start or resume the clock.
    Start,
    /// Pause the clock.
    Pause,
    /// Wipe scores and re-arm the clock.
    Reset,
    /// End the match early.
    Finalize,
    /// Choose the contestant the next scoring action applies to.
    SelectScorer,
    /// Drop the pending selection.
    ClearSelection,
    /// Credit points to the selected contestant.
    AddPoints,
    /// Charge a foul to the selected contestant.
    AddFoul,
}

/// What produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotCause {
    /// Session construction.
    Created,
    /// An accepted command.
    Command(Command),
    /// A regular clock tick.
    Tick,
    /// The terminal clock tick.
    Expired,
}

/// Immutable view of a session after a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Strictly increasing per session; one step per emitted snapshot.
    pub version: u64,
    /// What produced this snapshot.
    pub cause: SnapshotCause,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Clock values.
    pub clock: ClockState,
    /// Duration the clock was last configured or reset with.
    pub configured_seconds: Option<u32>,
    /// Home tally.
    pub home: ContestantScore,
    /// Away tally.
    pub away: ContestantScore,
    /// Pending scorer selection.
    pub selection: Option<Side>,
    /// Set once the session is finished.
    pub finish_reason: Option<FinishReason>,
}

impl SessionSnapshot {
    /// Tally for `side`.
    pub fn score(&self, side: Side) -> ContestantScore {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    /// Whether this snapshot records the transition into [`SessionPhase::Finished`].
    pub fn is_finish(&self) -> bool {
        matches!(
            self.cause,
            SnapshotCause::Expired | SnapshotCause::Command(Command::Finalize)
        )
    }
}

/// Validated construction input for a [`ScoreSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    identities: Sides<ContestantIdentity>,
    duration_seconds: Option<u32>,
    starting_scores: Sides<ContestantScore>,
}

impl SessionDescriptor {
    /// Describe a session between `home` and `away`.
    pub fn new(home: ContestantIdentity, away: ContestantIdentity) -> Result<Self, DescriptorError> {
        for (label, value) in [
            ("home id", home.id()),
            ("home name", home.display_name()),
            ("away id", away.id()),
            ("away name", away.display_name()),
        ] {
            if value.trim().is_empty() {
                return Err(DescriptorError::Blank(label));
            }
        }

        if home.id() == away.id() {
            return Err(DescriptorError::DuplicateContestant(home.id().to_string()));
        }

        Ok(Self {
            identities: Sides::new(home, away),
            duration_seconds: None,
            starting_scores: Sides::default(),
        })
    }

    /// Arm the clock at construction so the session starts in `Ready`.
    pub fn with_duration(mut self, duration_seconds: u32) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }

    /// Resume from scores recorded elsewhere.
    pub fn with_starting_scores(mut self, home: ContestantScore, away: ContestantScore) -> Self {
        self.starting_scores = Sides::new(home, away);
        self
    }

    /// Contestants of the session.
    pub fn identities(&self) -> &Sides<ContestantIdentity> {
        &self.identities
    }
}

/// Aggregate root driving one officiated match.
#[derive(Debug, Clone)]
pub struct ScoreSession {
    identities: Sides<ContestantIdentity>,
    scores: Sides<ContestantScore>,
    clock: MatchClock,
    selection: Option<Side>,
    machine: SessionStateMachine,
    configured_seconds: Option<u32>,
    finish_reason: Option<FinishReason>,
    version: u64,
    last_cause: SnapshotCause,
}

impl ScoreSession {
    /// Build a session from a validated descriptor.
    ///
    /// Fails with [`SessionError::InvalidDuration`] when the descriptor carries
    /// a zero duration.
    pub fn new(descriptor: SessionDescriptor) -> Result<Self, SessionError> {
        let SessionDescriptor {
            identities,
            duration_seconds,
            starting_scores,
        } = descriptor;

        let mut session = Self {
            identities,
            scores: starting_scores,
            clock: MatchClock::new(),
            selection: None,
            machine: SessionStateMachine::new(),
            configured_seconds: None,
            finish_reason: None,
            version: 0,
            last_cause: SnapshotCause::Created,
        };

        if let Some(duration) = duration_seconds {
            session.arm(duration, Command::Configure)?;
        }

        Ok(session)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Current clock values.
    pub fn clock(&self) -> ClockState {
        self.clock.state()
    }

    /// Tally for `side`.
    pub fn score(&self, side: Side) -> ContestantScore {
        *self.scores.get(side)
    }

    /// Identity for `side`.
    pub fn identity(&self, side: Side) -> &ContestantIdentity {
        self.identities.get(side)
    }

    /// Both identities.
    pub fn identities(&self) -> &Sides<ContestantIdentity> {
        &self.identities
    }

    /// Pending scorer selection.
    pub fn selection(&self) -> Option<Side> {
        self.selection
    }

    /// Current state as a snapshot, without emitting a new version.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: self.version,
            cause: self.last_cause,
            phase: self.phase(),
            clock: self.clock.state(),
            configured_seconds: self.configured_seconds,
            home: self.scores.home,
            away: self.scores.away,
            selection: self.selection,
            finish_reason: self.finish_reason,
        }
    }

    /// Set the match duration; moves `Configuring` to `Ready`.
    ///
    /// From `Ready` the clock is simply re-armed with the new duration.
    pub fn configure(&mut self, duration_seconds: u32) -> CommandResult {
        self.arm(duration_seconds, Command::Configure)?;
        Ok(Some(self.emit(SnapshotCause::Command(Command::Configure))))
    }

    /// Start or resume the clock.
    pub fn start(&mut self) -> CommandResult {
        if self.phase() == SessionPhase::Running {
            return Ok(None);
        }

        let plan = self.plan(SessionEvent::Start, Command::Start)?;
        self.clock
            .start()
            .map_err(|err| self.clock_error(err, Command::Start))?;
        self.commit(plan)?;
        Ok(Some(self.emit(SnapshotCause::Command(Command::Start))))
    }

    /// Pause the clock without losing time.
    pub fn pause(&mut self) -> CommandResult {
        if self.phase() == SessionPhase::Paused {
            return Ok(None);
        }

        let plan = self.plan(SessionEvent::Pause, Command::Pause)?;
        self.clock.pause();
        self.commit(plan)?;
        Ok(Some(self.emit(SnapshotCause::Command(Command::Pause))))
    }

    /// End the match now, keeping the scores as they are.
    pub fn finalize(&mut self) -> CommandResult {
        let plan = self.plan(SessionEvent::Finalize, Command::Finalize)?;
        self.clock.pause();
        self.commit(plan)?;
        self.selection = None;
        self.finish_reason = Some(FinishReason::Finalized);
        Ok(Some(self.emit(SnapshotCause::Command(Command::Finalize))))
    }

    /// Wipe scores, fouls and selection, and re-arm the clock with
    /// `duration_seconds`.
    ///
    /// The session passes through `Configuring` and, since a valid duration is
    /// supplied, lands in `Ready`. Accepted from every phase, including
    /// `Finished` for a rematch.
    pub fn reset(&mut self, duration_seconds: u32) -> CommandResult {
        let duration = positive(duration_seconds)?;
        let plan = self.plan(SessionEvent::Reset, Command::Reset)?;
        self.clock
            .reset(duration)
            .map_err(|err| self.clock_error(err, Command::Reset))?;
        self.commit(plan)?;

        self.scores = Sides::default();
        self.selection = None;
        self.finish_reason = None;

        self.arm(duration, Command::Reset)?;
        Ok(Some(self.emit(SnapshotCause::Command(Command::Reset))))
    }

    /// Choose which contestant the next point or foul applies to.
    pub fn select_scorer(&mut self, side: Side) -> CommandResult {
        self.ensure_scoring_phase(Command::SelectScorer)?;
        if self.selection == Some(side) {
            return Ok(None);
        }
        self.selection = Some(side);
        Ok(Some(self.emit(SnapshotCause::Command(Command::SelectScorer))))
    }

    /// Drop a pending selection without scoring.
    pub fn clear_selection(&mut self) -> CommandResult {
        self.ensure_scoring_phase(Command::ClearSelection)?;
        if self.selection.take().is_none() {
            return Ok(None);
        }
        Ok(Some(self.emit(SnapshotCause::Command(Command::ClearSelection))))
    }

    /// Credit `delta` points (negative for corrections) to the selected
    /// contestant, clamping at zero. Consumes the selection.
    pub fn add_points(&mut self, delta: i32) -> CommandResult {
        let side = self.take_selection()?;
        self.scores.get_mut(side).apply_points(delta);
        Ok(Some(self.emit(SnapshotCause::Command(Command::AddPoints))))
    }

    /// Charge one foul to the selected contestant. Consumes the selection.
    pub fn add_foul(&mut self) -> CommandResult {
        let side = self.take_selection()?;
        self.scores.get_mut(side).add_foul();
        Ok(Some(self.emit(SnapshotCause::Command(Command::AddFoul))))
    }

    /// Advance the clock by one elapsed second.
    ///
    /// Returns `None` unless the session is running. The tick that empties
    /// the clock moves the session to `Finished` and yields the single
    /// expiry snapshot.
    pub fn tick(&mut self) -> Option<SessionSnapshot> {
        if self.phase() != SessionPhase::Running {
            return None;
        }

        match self.clock.tick()? {
            Tick::Elapsed { .. } => Some(self.emit(SnapshotCause::Tick)),
            Tick::Expired => {
                let plan = match self.machine.plan(SessionEvent::Expire) {
                    Ok(plan) => plan,
                    Err(err) => {
                        warn!(error = %err, "clock expired outside of a running phase");
                        return None;
                    }
                };
                if let Err(err) = self.machine.apply(plan) {
                    warn!(error = %err, "failed to apply expiry transition");
                    return None;
                }
                self.selection = None;
                self.finish_reason = Some(FinishReason::Expired);
                Some(self.emit(SnapshotCause::Expired))
            }
        }
    }

    fn arm(&mut self, duration_seconds: u32, command: Command) -> Result<(), SessionError> {
        let plan = self.plan(SessionEvent::Configure, command)?;
        let duration = positive(duration_seconds)?;
        self.clock
            .configure(duration)
            .map_err(|err| self.clock_error(err, command))?;
        self.configured_seconds = Some(duration);
        self.commit(plan)?;
        Ok(())
    }

    fn plan(&self, event: SessionEvent, command: Command) -> Result<Plan, SessionError> {
        self.machine
            .plan(event)
            .map_err(|InvalidTransition { from, .. }| rejected(from, command))
    }

    fn commit(&mut self, plan: Plan) -> Result<(), SessionError> {
        let command_phase = self.phase();
        self.machine.apply(plan).map(|_| ()).map_err(|err| {
            warn!(
                error = %err,
                event = ?plan.event,
                machine_version = self.machine.version(),
                "planned transition no longer applies"
            );
            SessionError::InvalidState {
                phase: command_phase,
                command: command_for(plan.event),
            }
        })
    }

    fn ensure_scoring_phase(&self, command: Command) -> Result<(), SessionError> {
        match self.phase() {
            SessionPhase::Running | SessionPhase::Paused => Ok(()),
            phase => Err(rejected(phase, command)),
        }
    }

    fn take_selection(&mut self) -> Result<Side, SessionError> {
        if self.phase() == SessionPhase::Finished {
            return Err(SessionError::SessionFinished);
        }
        self.selection.take().ok_or(SessionError::NoScorerSelected)
    }

    fn clock_error(&self, err: ClockError, command: Command) -> SessionError {
        match err {
            ClockError::Running => SessionError::InvalidState {
                phase: self.phase(),
                command,
            },
            ClockError::Exhausted => SessionError::ClockExhausted,
            ClockError::InvalidDuration(seconds) => SessionError::InvalidDuration(seconds),
        }
    }

    fn emit(&mut self, cause: SnapshotCause) -> SessionSnapshot {
        self.version += 1;
        self.last_cause = cause;
        self.snapshot()
    }
}

fn rejected(phase: SessionPhase, command: Command) -> SessionError {
    match (phase, command) {
        // `start` from a finished match is a plain phase error.
        (SessionPhase::Finished, Command::Start) => SessionError::InvalidState { phase, command },
        (SessionPhase::Finished, _) => SessionError::SessionFinished,
        (phase, command) => SessionError::InvalidState { phase, command },
    }
}

fn command_for(event: SessionEvent) -> Command {
    match event {
        SessionEvent::Configure => Command::Configure,
        SessionEvent::Start => Command::Start,
        SessionEvent::Pause => Command::Pause,
        SessionEvent::Expire | SessionEvent::Finalize => Command::Finalize,
        SessionEvent::Reset => Command::Reset,
    }
}

fn positive(duration_seconds: u32) -> Result<u32, SessionError> {
    if duration_seconds == 0 {
        return Err(SessionError::InvalidDuration(duration_seconds));
    }
    Ok(duration_seconds)
}
