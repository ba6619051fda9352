/// Named JSON events derived from session snapshots.
pub mod feed_events;
/// Async session handle driving the clock.
pub mod live_session;
/// Independent sessions keyed by identifier.
pub mod registry;
/// Scripted command replay.
pub mod replay;
/// Final result hand-off with retries.
pub mod result_reporter;
