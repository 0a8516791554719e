//! The periodic publication tick (§4.4 of the design).
//!
//! One `tokio` task per `RUNNING` session, ticking at the session's own
//! `publishTickMillis` period. The tick logic itself — advancing the
//! simulation clock, draining due events, detecting catalogue exhaustion
//! — lives on [`Session::tick`](crate::session::Session); this module
//! only owns the interval and the task's lifecycle.
//!
//! Grounded on `other_examples/.../uri157-exchange-simulator`'s
//! per-session `tokio::spawn` + `JoinHandle` pattern, but driven by a
//! fixed-period `tokio::time::interval` rather than a sleep computed
//! from the next event's timestamp, and with
//! [`MissedTickBehavior::Delay`] so a late wakeup never bursts through
//! several ticks worth of `Δ` at once (§4.4 "no catch-up").

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::Session;

/// Spawn the tick loop for a session that has just transitioned to `Running`.
pub(crate) fn spawn(session: Arc<Session>) -> JoinHandle<()> {
    let tick_millis = session.tick_millis();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_millis));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if !session.tick().await {
                break;
            }
        }

        tracing::trace!(session_id = %session.id, "scheduler task exited");
    })
}
