//! Independent live sessions keyed by identifier, for venues officiating
//! several games at once.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::EngineConfig,
    dto::descriptor::SessionDescriptorInput,
    error::ServiceError,
    services::{
        live_session::LiveSession,
        result_reporter::{ResultSink, spawn_result_reporter},
    },
    state::SessionDescriptor,
};

/// Registry of live sessions.
///
/// Sessions never share state; the map only hands out handles.
pub struct SessionRegistry {
    config: Arc<EngineConfig>,
    sessions: DashMap<Uuid, LiveSession>,
    sink: Option<Arc<dyn ResultSink>>,
    reporters: DashMap<Uuid, JoinHandle<()>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
            sessions: DashMap::new(),
            sink: None,
            reporters: DashMap::new(),
        }
    }

    /// Report final results of every session created from now on to `sink`.
    pub fn with_result_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Register a new session built from a validated descriptor.
    pub fn create(&self, descriptor: SessionDescriptor) -> Result<LiveSession, ServiceError> {
        let session = LiveSession::new(descriptor, &self.config)?;
        if let Some(sink) = &self.sink {
            let reporter = spawn_result_reporter(&session, sink.clone(), self.config.report);
            self.reporters.insert(session.id(), reporter);
        }

        let identities = session.identities();
        info!(
            session_id = %session.id(),
            home = identities.home.id(),
            away = identities.away.id(),
            "session registered"
        );
        self.sessions.insert(session.id(), session.clone());
        Ok(session)
    }

    /// Validate raw input and register the resulting session.
    ///
    /// A missing duration falls back to the configured default.
    pub fn create_from_input(
        &self,
        input: SessionDescriptorInput,
    ) -> Result<LiveSession, ServiceError> {
        input.validate()?;
        let descriptor = input.into_descriptor(self.config.default_duration_seconds)?;
        self.create(descriptor)
    }

    /// Look up a session.
    pub fn get(&self, id: Uuid) -> Result<LiveSession, ServiceError> {
        self.sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))
    }

    /// Forget a session. Its clock stops once the last outstanding handle is dropped.
    pub fn remove(&self, id: Uuid) -> Result<LiveSession, ServiceError> {
        let (_, session) = self
            .sessions
            .remove(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))?;
        self.reporters.retain(|_, reporter| !reporter.is_finished());
        info!(session_id = %id, "session removed");
        Ok(session)
    }

    /// Drop every session and wait for their result reporters, including
    /// pending retries, to finish.
    ///
    /// A reporter only ends once its session is gone, so callers must drop
    /// their own handles first.
    pub async fn shutdown(self) {
        self.sessions.clear();
        let reporters: Vec<(Uuid, JoinHandle<()>)> = self.reporters.into_iter().collect();

        for (session_id, reporter) in reporters {
            if let Err(err) = reporter.await {
                warn!(%session_id, error = %err, "result reporter task failed");
            }
        }
        info!("session registry shut down");
    }

    /// Identifiers of all registered sessions.
    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
