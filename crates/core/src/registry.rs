//! Process-wide table of live sessions (§4.2 of the design).
//!
//! Grounded on the teacher's `SessionManager`
//! (`crates/core/src/session/mod.rs` in `marmikshah-rtsp-rs`): an
//! `Arc<RwLock<HashMap<..>>>` keyed registry with `create`/`get`/`remove`,
//! plus a sweep for entries that have gone idle. `parking_lot::RwLock` is
//! kept here (unlike the per-session lock) because the registry is only
//! ever held for a map lookup/insert/remove — never across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::catalogue::Catalogue;
use crate::error::{SessionError, SessionResult};
use crate::session::{Session, SessionId, SessionState};

/// Owns every live [`Session`], and the shared [`Catalogue`] new sessions
/// are built against.
pub struct SessionRegistry {
    catalogue: Arc<Catalogue>,
    outbound_capacity: usize,
    tick_millis: u64,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    /// Build an empty registry over a shared catalogue.
    pub fn new(catalogue: Arc<Catalogue>, outbound_capacity: usize, tick_millis: u64) -> Self {
        SessionRegistry {
            catalogue,
            outbound_capacity,
            tick_millis,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fresh `CREATED` session and register it.
    pub fn create(&self) -> Arc<Session> {
        let session = Session::new(
            Arc::clone(&self.catalogue),
            self.outbound_capacity,
            self.tick_millis,
        );
        self.sessions.write().insert(session.id, Arc::clone(&session));
        tracing::info!(session_id = %session.id, "session created");
        session
    }

    /// Look up a session by id, parsed from its string form.
    pub fn get(&self, id: &str) -> SessionResult<Arc<Session>> {
        let id: SessionId = id
            .parse()
            .map_err(|_| SessionError::UnknownSession(id.to_string()))?;
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))
    }

    /// Number of sessions currently tracked (including terminal ones that
    /// have not yet been swept).
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Evict every session whose `last_access_millis` is older than `ttl`,
    /// relative to `now_millis`, removing it from the table once evicted.
    ///
    /// Run periodically by [`crate::registry::SessionRegistry::spawn_eviction_sweep`].
    pub async fn evict_idle(&self, now_millis: i64, ttl: Duration) {
        let candidates: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();

        let ttl_millis = ttl.as_millis() as i64;
        let mut evicted = Vec::new();
        for session in candidates {
            let last_access = session.last_access_millis().await;
            let state = session.state().await;
            if state == SessionState::Evicted {
                evicted.push(session.id);
                continue;
            }
            if now_millis - last_access > ttl_millis {
                session.evict().await;
                evicted.push(session.id);
            }
        }

        if !evicted.is_empty() {
            let mut table = self.sessions.write();
            for id in &evicted {
                table.remove(id);
            }
            tracing::info!(count = evicted.len(), "idle sessions evicted");
        }
    }
}

/// Spawn the background idle-TTL sweep, running every `interval` and
/// evicting sessions idle for longer than `ttl`.
///
/// Grounded on the teacher's `accept_loop`/connection-cleanup shape
/// (`crates/core/src/transport/tcp.rs`), restructured around a
/// `tokio::time::interval` since there is no socket to block on here.
pub fn spawn_eviction_sweep(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = crate::session::now_millis();
            registry.evict_idle(now, ttl).await;
        }
    })
}
