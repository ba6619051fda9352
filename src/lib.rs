//! Library crate for courtside, a live match clock and scoring engine.
//!
//! [`state`] holds the synchronous core ([`state::ScoreSession`] and its
//! clock); [`services`] wraps it into async, tick-driven live sessions.

pub mod config;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;
