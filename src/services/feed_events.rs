//! Translates session snapshots into named JSON feed events.

use std::time::SystemTime;

use futures::{StreamExt, stream::{self, BoxStream}};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{feed::FeedEvent, snapshot::SnapshotDto},
    services::live_session::LiveSession,
    state::{ContestantIdentity, SessionSnapshot, Sides, SnapshotCause},
};

/// Any accepted command, plus the initial snapshot.
pub const EVENT_SESSION_SNAPSHOT: &str = "session.snapshot";
/// One elapsed second.
pub const EVENT_CLOCK_TICK: &str = "clock.tick";
/// The clock reached zero.
pub const EVENT_CLOCK_EXPIRED: &str = "clock.expired";
/// The session entered `Finished`, by expiry or finalization.
pub const EVENT_SESSION_FINISHED: &str = "session.finished";

/// Event names describing `snapshot`, in emission order.
pub fn event_names(snapshot: &SessionSnapshot) -> &'static [&'static str] {
    match snapshot.cause {
        SnapshotCause::Tick => &[EVENT_CLOCK_TICK],
        SnapshotCause::Expired => &[EVENT_CLOCK_EXPIRED, EVENT_SESSION_FINISHED],
        _ if snapshot.is_finish() => &[EVENT_SESSION_FINISHED],
        _ => &[EVENT_SESSION_SNAPSHOT],
    }
}

/// Encode `snapshot` into its feed events. Payloads that fail to serialize
/// are logged and skipped.
pub fn encode_snapshot(
    session_id: Uuid,
    identities: &Sides<ContestantIdentity>,
    snapshot: &SessionSnapshot,
) -> Vec<FeedEvent> {
    encode_as(session_id, identities, snapshot, event_names(snapshot))
}

fn encode_as(
    session_id: Uuid,
    identities: &Sides<ContestantIdentity>,
    snapshot: &SessionSnapshot,
    names: &[&'static str],
) -> Vec<FeedEvent> {
    let payload = SnapshotDto::new(session_id, identities, snapshot, SystemTime::now());
    names
        .iter()
        .filter_map(|&event| match FeedEvent::json(event, &payload) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(%session_id, event, error = %err, "failed to serialize feed payload");
                None
            }
        })
        .collect()
}

/// Stream of feed events for `session`: one `session.snapshot` with the
/// current state, then one or more events per snapshot published afterwards.
///
/// Lagging consumers skip the snapshots they missed. The stream ends when the
/// session is dropped.
pub async fn feed_stream(session: &LiveSession) -> BoxStream<'static, FeedEvent> {
    let session_id = session.id();
    let identities = session.identities().clone();
    let (current, updates) = session.watch().await;

    let initial = encode_as(session_id, &identities, &current, &[EVENT_SESSION_SNAPSHOT]);
    let updates = updates.flat_map(move |item| {
        let events = match item {
            Ok(snapshot) => encode_snapshot(session_id, &identities, &snapshot),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(%session_id, skipped, "feed consumer lagged behind");
                Vec::new()
            }
        };
        stream::iter(events)
    });

    stream::iter(initial).chain(updates).boxed()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;
    use tokio::time::sleep;

    use super::*;
    use crate::{
        config::EngineConfig,
        state::{ContestantScore, SessionDescriptor, Side},
    };

    fn live(duration: u32) -> LiveSession {
        let descriptor = SessionDescriptor::new(
            ContestantIdentity::team("t-1", "Harbor Hawks"),
            ContestantIdentity::team("t-2", "Ridge Runners"),
        )
        .unwrap()
        .with_duration(duration);
        LiveSession::new(descriptor, &EngineConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn names_follow_the_snapshot_cause() {
        let session = live(2);
        let feed = feed_stream(&session).await;

        session.start().await.unwrap();
        session.select_scorer(Side::Home).await.unwrap();
        sleep(Duration::from_millis(2_500)).await;
        drop(session);

        let names: Vec<String> = feed.map(|event| event.event).collect().await;
        assert_eq!(
            names,
            vec![
                EVENT_SESSION_SNAPSHOT,
                EVENT_SESSION_SNAPSHOT,
                EVENT_SESSION_SNAPSHOT,
                EVENT_CLOCK_TICK,
                EVENT_CLOCK_EXPIRED,
                EVENT_SESSION_FINISHED,
            ]
        );
    }

    #[tokio::test]
    async fn finalize_is_reported_as_finished() {
        let session = live(60);
        let feed = feed_stream(&session).await;

        session.start().await.unwrap();
        session.finalize().await.unwrap();
        drop(session);

        let events: Vec<FeedEvent> = feed.collect().await;
        assert_eq!(events.len(), 3);
        let last = &events[2];
        assert_eq!(last.event, EVENT_SESSION_FINISHED);

        let data: Value = serde_json::from_str(&last.data).unwrap();
        assert_eq!(data["phase"], "finished");
        assert_eq!(data["finish_reason"], "finalized");
        assert_eq!(data["home"]["name"], "Harbor Hawks");
    }

    #[tokio::test]
    async fn feed_opens_with_the_starting_scores() {
        let descriptor = SessionDescriptor::new(
            ContestantIdentity::team("t-1", "Harbor Hawks"),
            ContestantIdentity::team("t-2", "Ridge Runners"),
        )
        .unwrap()
        .with_duration(60)
        .with_starting_scores(ContestantScore::new(12, 3), ContestantScore::default());
        let session = LiveSession::new(descriptor, &EngineConfig::default()).unwrap();

        let mut feed = feed_stream(&session).await;
        let first = feed.next().await.unwrap();
        assert_eq!(first.event, EVENT_SESSION_SNAPSHOT);

        let data: Value = serde_json::from_str(&first.data).unwrap();
        assert_eq!(data["phase"], "ready");
        assert_eq!(data["cause"]["kind"], "created");
        assert_eq!(data["home"]["points"], 12);
        assert_eq!(data["home"]["fouls"], 3);
    }
}
