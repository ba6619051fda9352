use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::state::session::SessionSnapshot;

/// Broadcast hub fanning session snapshots out to subscribers.
///
/// Sending never blocks; subscribers that fall more than `capacity` snapshots
/// behind observe a lag and skip ahead.
pub struct SnapshotHub {
    sender: broadcast::Sender<SessionSnapshot>,
}

impl SnapshotHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.sender.subscribe()
    }

    /// Same as [`SnapshotHub::subscribe`], wrapped as a `Stream`.
    pub fn stream(&self) -> BroadcastStream<SessionSnapshot> {
        BroadcastStream::new(self.subscribe())
    }

    /// Send a snapshot to all current subscribers, ignoring the no-subscriber case.
    pub fn broadcast(&self, snapshot: SessionSnapshot) {
        let _ = self.sender.send(snapshot);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
