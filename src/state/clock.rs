//! Whole-second countdown used to time a match.
//!
//! The clock itself never sleeps: something else (the live session ticker, or
//! a test) calls [`MatchClock::tick`] once per elapsed second.

use thiserror::Error;

/// Observable clock values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockState {
    /// Seconds left on the clock.
    pub remaining_seconds: u32,
    /// Whether the countdown is currently advancing.
    pub is_running: bool,
}

/// Failures reported by [`MatchClock`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The clock cannot be re-armed while it is running.
    #[error("clock is running")]
    Running,
    /// No time is left; the clock must be reset first.
    #[error("clock exhausted")]
    Exhausted,
    /// Durations must be strictly positive.
    #[error("invalid duration: {0} seconds")]
    InvalidDuration(u32),
}

/// Result of [`MatchClock::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The clock was stopped and is now running.
    Started,
    /// The clock was already running; nothing changed.
    AlreadyRunning,
}

/// Result of [`MatchClock::pause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    /// The clock was running and is now stopped.
    Paused,
    /// The clock was not running; nothing changed.
    AlreadyStopped,
}

/// Result of a tick on a running clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// One second elapsed and time remains.
    Elapsed {
        /// Seconds left after this tick.
        remaining_seconds: u32,
    },
    /// The last second elapsed; the clock stopped itself.
    Expired,
}

/// Countdown timer with start/pause/reset.
#[derive(Debug, Clone, Default)]
pub struct MatchClock {
    state: ClockState,
}

impl MatchClock {
    /// Create an unarmed clock with no time on it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock values.
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Arm the clock with `duration_seconds`. Only legal while stopped.
    pub fn configure(&mut self, duration_seconds: u32) -> Result<(), ClockError> {
        if self.state.is_running {
            return Err(ClockError::Running);
        }
        let duration = positive(duration_seconds)?;
        self.state = ClockState {
            remaining_seconds: duration,
            is_running: false,
        };
        Ok(())
    }

    /// Start or resume the countdown.
    pub fn start(&mut self) -> Result<StartOutcome, ClockError> {
        if self.state.remaining_seconds == 0 {
            return Err(ClockError::Exhausted);
        }
        if self.state.is_running {
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.state.is_running = true;
        Ok(StartOutcome::Started)
    }

    /// Stop the countdown, keeping the remaining time.
    pub fn pause(&mut self) -> PauseOutcome {
        if !self.state.is_running {
            return PauseOutcome::AlreadyStopped;
        }
        self.state.is_running = false;
        PauseOutcome::Paused
    }

    /// Stop the countdown and put `duration_seconds` back on the clock.
    pub fn reset(&mut self, duration_seconds: u32) -> Result<(), ClockError> {
        let duration = positive(duration_seconds)?;
        self.state = ClockState {
            remaining_seconds: duration,
            is_running: false,
        };
        Ok(())
    }

    /// Advance by one elapsed second.
    ///
    /// Returns `None` when the clock is stopped, so late ticks after a pause or
    /// expiry are harmless.
    pub fn tick(&mut self) -> Option<Tick> {
        if !self.state.is_running {
            return None;
        }

        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            self.state.is_running = false;
            return Some(Tick::Expired);
        }

        Some(Tick::Elapsed {
            remaining_seconds: self.state.remaining_seconds,
        })
    }
}

fn positive(duration_seconds: u32) -> Result<u32, ClockError> {
    if duration_seconds == 0 {
        return Err(ClockError::InvalidDuration(duration_seconds));
    }
    Ok(duration_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(seconds: u32) -> MatchClock {
        let mut clock = MatchClock::new();
        clock.configure(seconds).unwrap();
        clock
    }

    #[test]
    fn new_clock_is_exhausted() {
        let mut clock = MatchClock::new();
        assert_eq!(clock.start(), Err(ClockError::Exhausted));
        assert_eq!(clock.state(), ClockState::default());
    }

    #[test]
    fn configure_rejects_zero_and_running_clock() {
        let mut clock = MatchClock::new();
        assert_eq!(clock.configure(0), Err(ClockError::InvalidDuration(0)));

        let mut clock = armed(30);
        clock.start().unwrap();
        assert_eq!(clock.configure(10), Err(ClockError::Running));
        assert_eq!(clock.state().remaining_seconds, 30);
        assert!(clock.state().is_running);
    }

    #[test]
    fn start_twice_is_a_no_op() {
        let mut clock = armed(5);
        assert_eq!(clock.start(), Ok(StartOutcome::Started));
        assert_eq!(clock.start(), Ok(StartOutcome::AlreadyRunning));
        assert!(clock.state().is_running);
    }

    #[test]
    fn pause_twice_changes_state_once() {
        let mut clock = armed(5);
        clock.start().unwrap();
        clock.tick();
        assert_eq!(clock.pause(), PauseOutcome::Paused);
        assert_eq!(clock.pause(), PauseOutcome::AlreadyStopped);
        assert_eq!(clock.state().remaining_seconds, 4);
    }

    #[test]
    fn ticks_only_count_while_running() {
        let mut clock = armed(5);
        assert_eq!(clock.tick(), None);

        clock.start().unwrap();
        assert_eq!(
            clock.tick(),
            Some(Tick::Elapsed {
                remaining_seconds: 4
            })
        );

        clock.pause();
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.state().remaining_seconds, 4);

        clock.start().unwrap();
        assert_eq!(
            clock.tick(),
            Some(Tick::Elapsed {
                remaining_seconds: 3
            })
        );
    }

    #[test]
    fn expiry_fires_once_and_stops_the_clock() {
        let mut clock = armed(3);
        clock.start().unwrap();

        let ticks: Vec<_> = (0..6).filter_map(|_| clock.tick()).collect();
        assert_eq!(
            ticks,
            vec![
                Tick::Elapsed {
                    remaining_seconds: 2
                },
                Tick::Elapsed {
                    remaining_seconds: 1
                },
                Tick::Expired,
            ]
        );
        assert_eq!(
            clock.state(),
            ClockState {
                remaining_seconds: 0,
                is_running: false
            }
        );
        assert_eq!(clock.start(), Err(ClockError::Exhausted));
    }

    #[test]
    fn reset_stops_and_rearms() {
        let mut clock = armed(10);
        clock.start().unwrap();
        clock.tick();

        assert_eq!(clock.reset(0), Err(ClockError::InvalidDuration(0)));
        assert!(clock.state().is_running);

        clock.reset(60).unwrap();
        assert_eq!(
            clock.state(),
            ClockState {
                remaining_seconds: 60,
                is_running: false
            }
        );
    }
}
