//! Streaming session registry.
//!
//! Maps an ephemeral session id to an open push channel so long-running
//! aggregation calls can report milestones before their final result.
//! Session ids are `{parent}_{unix_millis}` so one client connection can
//! own several concurrent runs without event cross-talk.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;

use rivalscope_common::StreamEvent;

use crate::aggregator::ProgressSink;

/// Interval between keepalive events on every open session.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub struct StreamSessionRegistry {
    sessions: RwLock<HashMap<String, mpsc::UnboundedSender<StreamEvent>>>,
}

impl StreamSessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Derive a run-scoped session id from the owning connection's id.
    pub fn make_session_id(parent: &str) -> String {
        format!("{parent}_{}", Utc::now().timestamp_millis())
    }

    /// Register a push channel for `session_id` and start its keepalive
    /// ticker. The ticker stops when the session closes or the receiver is
    /// dropped.
    pub fn open(self: &Arc<Self>, session_id: &str) -> mpsc::UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions
            .write()
            .expect("sessions lock poisoned")
            .insert(session_id.to_string(), tx);
        debug!(session_id, "Stream session opened");

        let registry = Arc::clone(self);
        let id = session_id.to_string();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                if !registry.keepalive(&id) {
                    break;
                }
            }
        });

        rx
    }

    /// Deliver an event. Unknown or already-closed session ids are a no-op,
    /// not an error.
    pub fn send(&self, session_id: &str, event: StreamEvent) {
        let sessions = self.sessions.read().expect("sessions lock poisoned");
        if let Some(tx) = sessions.get(session_id) {
            let _ = tx.send(event);
        }
    }

    pub fn close(&self, session_id: &str) {
        self.sessions
            .write()
            .expect("sessions lock poisoned")
            .remove(session_id);
        debug!(session_id, "Stream session closed");
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.read().expect("sessions lock poisoned").len()
    }

    /// Send one keepalive. Returns false when the session is gone or its
    /// receiver hung up, in which case the entry is dropped.
    fn keepalive(&self, session_id: &str) -> bool {
        let alive = {
            let sessions = self.sessions.read().expect("sessions lock poisoned");
            match sessions.get(session_id) {
                Some(tx) => tx.send(StreamEvent::Keepalive).is_ok(),
                None => false,
            }
        };
        if !alive {
            self.sessions
                .write()
                .expect("sessions lock poisoned")
                .remove(session_id);
        }
        alive
    }
}

impl Default for StreamSessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// ProgressSink bound to one session of a registry.
pub struct SessionSink {
    registry: Arc<StreamSessionRegistry>,
    session_id: String,
}

impl SessionSink {
    pub fn new(registry: Arc<StreamSessionRegistry>, session_id: impl Into<String>) -> Self {
        Self {
            registry,
            session_id: session_id.into(),
        }
    }
}

impl ProgressSink for SessionSink {
    fn emit(&self, event: StreamEvent) {
        self.registry.send(&self.session_id, event);
    }
}
