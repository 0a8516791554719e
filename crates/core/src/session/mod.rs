//! Per-session virtual-clock replay state machine.
//!
//! A session owns a simulation clock and a cursor into the shared
//! [`Catalogue`](crate::catalogue::Catalogue), plus the outbound channel
//! its publication ticks feed. Created by the registry, mutated only
//! through the control operations below, each of which takes the
//! session's own lock for the duration of its work.
//!
//! ## Lifecycle
//!
//! ```text
//! CREATED --start()--> RUNNING --stop()--> STOPPED --start()--> RUNNING
//!    |                    | cursor==N
//!    |                    v
//!    |               COMPLETED
//!    |
//!    +-- idle > TTL (any non-terminal state) --> EVICTED
//! ```
//!
//! `rewind`, `setSpeed`, `forward`, `jumpTo` are self-loops on any
//! non-terminal state, except `forward` may also land on `COMPLETED`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::catalogue::{Catalogue, Event};
use crate::error::{SessionError, SessionResult};

/// Default outbound channel capacity (`outboundCapacity` config key).
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1024;

/// Stream of events delivered to a session's single subscriber.
///
/// Closes (yields `None`) when the session completes, is evicted, or
/// the current subscriber is replaced by a fresh [`Session::subscribe`].
pub type EventStream = ReceiverStream<Event>;

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the Unix epoch")
        .as_millis() as i64
}

/// Opaque session identifier (UUID-shape string, per the REST contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SessionId(Uuid::parse_str(s)?))
    }
}

/// Replay session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet started.
    Created,
    /// Scheduler is actively ticking and emitting due events.
    Running,
    /// Scheduler is inactive; cursor/clock frozen until the next `start`.
    Stopped,
    /// Cursor has reached the end of the catalogue. Terminal.
    Completed,
    /// Removed by the idle-TTL sweep. Terminal.
    Evicted,
}

impl SessionState {
    fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Evicted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "CREATED",
            SessionState::Running => "RUNNING",
            SessionState::Stopped => "STOPPED",
            SessionState::Completed => "COMPLETED",
            SessionState::Evicted => "EVICTED",
        };
        write!(f, "{s}")
    }
}

struct SessionInner {
    state: SessionState,
    replay_speed: f64,
    sim_clock_millis: i64,
    cursor: usize,
    last_access_millis: i64,
    sender: Option<mpsc::Sender<Event>>,
    subscribed: bool,
    scheduler_handle: Option<JoinHandle<()>>,
}

/// A single replay session (§3 of the design).
///
/// Owns its own lock (`tokio::sync::Mutex`, deliberately async-aware
/// rather than `parking_lot`: the scheduler tick holds it across the
/// bounded channel's `send().await`, so control ops waiting on the same
/// session block cooperatively rather than spinning a thread).
pub struct Session {
    /// Opaque unique identifier.
    pub id: SessionId,
    catalogue: Arc<Catalogue>,
    tick_millis: u64,
    outbound_capacity: usize,
    inner: Mutex<SessionInner>,
}

impl Session {
    /// Create a new session in `CREATED` state, clock initialized to the
    /// catalogue's first timestamp.
    pub fn new(catalogue: Arc<Catalogue>, outbound_capacity: usize, tick_millis: u64) -> Arc<Self> {
        let sim_clock_millis = catalogue.first_timestamp();
        Arc::new(Session {
            id: SessionId::new(),
            catalogue,
            tick_millis: tick_millis.max(1),
            outbound_capacity,
            inner: Mutex::new(SessionInner {
                state: SessionState::Created,
                replay_speed: 1.0,
                sim_clock_millis,
                cursor: 0,
                last_access_millis: now_millis(),
                sender: None,
                subscribed: false,
                scheduler_handle: None,
            }),
        })
    }

    pub(crate) fn tick_millis(&self) -> u64 {
        self.tick_millis
    }

    pub(crate) fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Wall-clock time of the most recent control or subscribe operation.
    pub async fn last_access_millis(&self) -> i64 {
        self.inner.lock().await.last_access_millis
    }

    /// `(cursor, sim_clock_millis, replay_speed)` — for status/debug surfaces.
    pub async fn snapshot(&self) -> (usize, i64, f64) {
        let g = self.inner.lock().await;
        (g.cursor, g.sim_clock_millis, g.replay_speed)
    }

    /// `state ∈ {CREATED, STOPPED}` → `RUNNING`; idempotent if already running.
    pub async fn start(self: &Arc<Self>) -> SessionResult<String> {
        let mut g = self.inner.lock().await;
        g.last_access_millis = now_millis();

        if g.state.is_terminal() {
            return Err(SessionError::Terminal(self.id.to_string()));
        }
        if g.state == SessionState::Running {
            return Ok(g.state.to_string());
        }

        g.state = SessionState::Running;
        if g.scheduler_handle.is_none() {
            g.scheduler_handle = Some(crate::scheduler::spawn(Arc::clone(self)));
        }
        tracing::info!(session_id = %self.id, "session started");
        Ok(g.state.to_string())
    }

    /// Any non-terminal state → `STOPPED`; idempotent if already stopped.
    /// The in-flight tick (if any) finishes on its own — it observes the
    /// new state on its next iteration and lets its task exit.
    pub async fn stop(&self) -> SessionResult<String> {
        let mut g = self.inner.lock().await;
        g.last_access_millis = now_millis();

        if g.state.is_terminal() {
            return Err(SessionError::Terminal(self.id.to_string()));
        }

        g.state = SessionState::Stopped;
        tracing::info!(session_id = %self.id, "session stopped");
        Ok(g.state.to_string())
    }

    /// Reset the cursor and simulation clock to the start of the catalogue.
    /// Does not change `state` or `replay_speed`.
    pub async fn rewind(&self) -> SessionResult<String> {
        let mut g = self.inner.lock().await;
        g.last_access_millis = now_millis();

        if g.state.is_terminal() {
            return Err(SessionError::Terminal(self.id.to_string()));
        }

        g.cursor = 0;
        g.sim_clock_millis = self.catalogue.first_timestamp();
        tracing::info!(session_id = %self.id, "session rewound");
        Ok("REWOUND".to_string())
    }

    /// Set the replay speed multiplier. Takes effect on the next tick.
    pub async fn set_speed(&self, speed: f64) -> SessionResult<String> {
        if !(speed > 0.0) {
            return Err(SessionError::InvalidArgument(format!(
                "speed must be positive, got {speed}"
            )));
        }

        let mut g = self.inner.lock().await;
        g.last_access_millis = now_millis();

        if g.state.is_terminal() {
            return Err(SessionError::Terminal(self.id.to_string()));
        }

        g.replay_speed = speed;
        tracing::info!(session_id = %self.id, speed, "replay speed changed");
        Ok(format!("SPEED={speed}"))
    }

    /// Advance the cursor by `n` events, skipping them without emission.
    /// Transitions to `COMPLETED` (closing the outbound stream) if the
    /// cursor reaches the end of the catalogue.
    pub async fn forward(&self, n: usize) -> SessionResult<String> {
        if n == 0 {
            return Err(SessionError::InvalidArgument(
                "forward count must be positive".to_string(),
            ));
        }

        let mut g = self.inner.lock().await;
        g.last_access_millis = now_millis();

        if g.state.is_terminal() {
            return Err(SessionError::Terminal(self.id.to_string()));
        }

        let n_events = self.catalogue.len();
        g.cursor = (g.cursor + n).min(n_events);
        if g.cursor > 0 {
            g.sim_clock_millis = g
                .sim_clock_millis
                .max(self.catalogue.at(g.cursor - 1).timestamp_millis);
        }

        if g.cursor == n_events {
            g.state = SessionState::Completed;
            g.sender = None;
            g.subscribed = false;
            if let Some(handle) = g.scheduler_handle.take() {
                handle.abort();
            }
            tracing::info!(session_id = %self.id, "session completed via forward");
            Ok(g.state.to_string())
        } else {
            tracing::info!(session_id = %self.id, cursor = g.cursor, "session forwarded");
            Ok(format!("FORWARDED to {}", g.cursor))
        }
    }

    /// Jump directly to the event with the given id. Events strictly
    /// between the old and new cursor positions are skipped, not emitted.
    pub async fn jump_to(&self, event_id: u64) -> SessionResult<String> {
        let idx = self
            .catalogue
            .index_by_id(event_id)
            .map_err(|_| SessionError::UnknownEvent(event_id))?;

        let mut g = self.inner.lock().await;
        g.last_access_millis = now_millis();

        if g.state.is_terminal() {
            return Err(SessionError::Terminal(self.id.to_string()));
        }

        g.cursor = idx;
        g.sim_clock_millis = self.catalogue.at(idx).timestamp_millis;
        tracing::info!(session_id = %self.id, event_id, "session jumped");
        Ok(format!("JUMPED to {event_id}"))
    }

    /// Attach the single allowed subscriber and return its event stream.
    ///
    /// Events emitted before this call are never delivered to the new
    /// subscriber — there is no backfill. A `COMPLETED` session yields an
    /// immediately-closed stream rather than an error.
    pub async fn subscribe(self: &Arc<Self>) -> SessionResult<EventStream> {
        let mut g = self.inner.lock().await;
        g.last_access_millis = now_millis();

        if g.state == SessionState::Evicted {
            return Err(SessionError::Terminal(self.id.to_string()));
        }
        if g.subscribed {
            return Err(SessionError::AlreadySubscribed(self.id.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        g.subscribed = true;
        if g.state == SessionState::Completed {
            // `tx` is dropped here without being stored: the channel
            // closes immediately, so `rx` yields an empty, closed stream.
            drop(tx);
        } else {
            g.sender = Some(tx);
        }

        tracing::info!(session_id = %self.id, "subscriber attached");
        Ok(ReceiverStream::new(rx))
    }

    /// Release the current subscription slot (called by the transport
    /// layer when it detects the subscriber has disconnected). Does not
    /// stop the session — stopping is an explicit control op.
    pub async fn release_subscription(&self) {
        let mut g = self.inner.lock().await;
        if g.subscribed {
            g.subscribed = false;
            g.sender = None;
            tracing::debug!(session_id = %self.id, "subscription released");
        }
    }

    /// Force-terminate the session (idle-TTL eviction). Closes the
    /// outbound channel and aborts the scheduler task immediately —
    /// safe because the abort can only land while the task is parked
    /// between ticks, never mid-critical-section, since that section
    /// requires the same lock this call already holds.
    pub(crate) async fn evict(&self) {
        let mut g = self.inner.lock().await;
        g.state = SessionState::Evicted;
        g.sender = None;
        g.subscribed = false;
        if let Some(handle) = g.scheduler_handle.take() {
            handle.abort();
        }
        tracing::info!(session_id = %self.id, "session evicted");
    }

    /// Publication tick: advances the simulation clock by one `Δ` and
    /// drains every due event into the outbound channel (§4.4).
    ///
    /// Returns `false` when the scheduler task driving this session
    /// should stop looping (not running, or just completed).
    pub(crate) async fn tick(self: &Arc<Self>) -> bool {
        let mut g = self.inner.lock().await;

        if g.state != SessionState::Running {
            g.scheduler_handle = None;
            return false;
        }

        let delta = ((g.replay_speed * self.tick_millis as f64).round() as i64).max(1);
        let new_sim = g.sim_clock_millis + delta;
        let n_events = self.catalogue.len();
        let sender = g.sender.clone();

        while g.cursor < n_events && self.catalogue.at(g.cursor).timestamp_millis <= new_sim {
            let event = self.catalogue.at(g.cursor).clone();
            if let Some(tx) = &sender {
                // Held across the await deliberately: this is the
                // backpressure point, and per design it blocks control
                // ops on this session too, not just the scheduler.
                if tx.send(event).await.is_err() {
                    tracing::debug!(session_id = %self.id, "subscriber detached mid-tick");
                    g.sender = None;
                    g.subscribed = false;
                }
            }
            g.cursor += 1;
        }

        g.sim_clock_millis = new_sim;

        if g.cursor >= n_events {
            g.state = SessionState::Completed;
            g.sender = None;
            g.subscribed = false;
            g.scheduler_handle = None;
            tracing::info!(session_id = %self.id, "session completed");
            return false;
        }

        true
    }
}
