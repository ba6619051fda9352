use thiserror::Error;

/// Lifecycle phases of a scoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No duration has been set yet.
    Configuring,
    /// Clock armed, waiting for the first start.
    Ready,
    /// Clock counting down.
    Running,
    /// Clock stopped mid-match.
    Paused,
    /// Match over; scores are final.
    Finished,
}

/// Why a session reached [`SessionPhase::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The match clock ran out.
    Expired,
    /// An official ended the match early (forfeit, abandonment).
    Finalized,
}

/// Events that move the session between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A duration was set on the clock.
    Configure,
    /// The clock was started or resumed.
    Start,
    /// The clock was paused by an official.
    Pause,
    /// The clock reached zero.
    Expire,
    /// An official ended the match.
    Finalize,
    /// Scores and clock were wiped.
    Reset,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the event was received.
    pub from: SessionPhase,
    /// The rejected event.
    pub event: SessionEvent,
}

/// Error returned when a plan no longer matches the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// Phase changed since the plan was created.
    #[error("phase changed since planning (expected {expected:?}, got {actual:?})")]
    PhaseMismatch {
        /// Phase when the plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// Another transition was applied since the plan was created.
    #[error("version changed since planning (expected {expected}, got {actual})")]
    VersionMismatch {
        /// Version the plan would produce.
        expected: u64,
        /// Version applying now would produce.
        actual: u64,
    },
}

/// A validated transition that has not been applied yet.
///
/// Callers plan first, perform any side work that can still fail, and only then
/// apply, so a failed command leaves the phase untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Plan {
    /// Phase the state machine is in.
    pub from: SessionPhase,
    /// Phase the state machine will move to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: u64,
}

/// Phase table for a scoring session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: u64,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Configuring,
            version: 0,
        }
    }
}

impl SessionStateMachine {
    /// Create a state machine in [`SessionPhase::Configuring`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Validate that `event` can be applied from the current phase.
    pub fn plan(&self, event: SessionEvent) -> Result<Plan, InvalidTransition> {
        let to = self.compute_transition(event)?;
        Ok(Plan {
            from: self.phase,
            to,
            event,
            version_next: self.version + 1,
        })
    }

    /// Apply a previously computed plan, returning the new phase.
    pub fn apply(&mut self, plan: Plan) -> Result<SessionPhase, ApplyError> {
        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        Ok(self.phase)
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        use SessionEvent as E;
        use SessionPhase as P;

        let next = match (self.phase, event) {
            (P::Configuring | P::Ready, E::Configure) => P::Ready,
            (P::Ready | P::Paused, E::Start) => P::Running,
            (P::Running, E::Pause) => P::Paused,
            (P::Running, E::Expire) => P::Finished,
            (P::Configuring | P::Ready | P::Running | P::Paused, E::Finalize) => P::Finished,
            (_, E::Reset) => P::Configuring,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
