//! REST + SSE routes (spec.md §6, SPEC_FULL.md § Transport Adaptor).

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::routing::{get, post, put};
use replay_core::registry::SessionRegistry;
use replay_core::{Event, EventStream, Session};
use tokio_stream::{Stream, StreamExt};

use crate::error::ApiError;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

/// Build the router for the replay REST surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/mktdata/session", post(create_session))
        .route("/mktdata/session/start/{id}", put(start_session))
        .route("/mktdata/session/stop/{id}", put(stop_session))
        .route("/mktdata/session/rewind/{id}", put(rewind_session))
        .route("/mktdata/session/speed/{id}/{speed}", put(set_speed))
        .route("/mktdata/session/forward/{id}/{n}", put(forward_session))
        .route("/mktdata/session/jump/{id}/{event_id}", put(jump_session))
        .route("/mktdata/session/subscribe/{id}", get(subscribe_session))
        .with_state(state)
}

async fn create_session(State(state): State<AppState>) -> Result<String, ApiError> {
    let session = state.registry.create();
    Ok(session.id.to_string())
}

async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let session = state.registry.get(&id)?;
    Ok(session.start().await?)
}

async fn stop_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let session = state.registry.get(&id)?;
    Ok(session.stop().await?)
}

async fn rewind_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let session = state.registry.get(&id)?;
    Ok(session.rewind().await?)
}

async fn set_speed(
    State(state): State<AppState>,
    Path((id, speed)): Path<(String, f64)>,
) -> Result<String, ApiError> {
    let session = state.registry.get(&id)?;
    Ok(session.set_speed(speed).await?)
}

async fn forward_session(
    State(state): State<AppState>,
    Path((id, n)): Path<(String, usize)>,
) -> Result<String, ApiError> {
    let session = state.registry.get(&id)?;
    Ok(session.forward(n).await?)
}

async fn jump_session(
    State(state): State<AppState>,
    Path((id, event_id)): Path<(String, u64)>,
) -> Result<String, ApiError> {
    let session = state.registry.get(&id)?;
    Ok(session.jump_to(event_id).await?)
}

async fn subscribe_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let session = state.registry.get(&id)?;
    let events = session.subscribe().await?;
    let guarded = SubscriptionGuard {
        session: Arc::clone(&session),
        inner: events,
    };

    let stream = guarded.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// Wraps a session's [`EventStream`] so dropping it (axum drops the SSE
/// body future on client disconnect) releases the session's single
/// subscription slot (spec §5 Cancellation: the transport, not the
/// session, is responsible for this). Releasing is idempotent — a
/// session already stopped by the scheduler's own send-failure path
/// (`Session::tick`) just no-ops here.
struct SubscriptionGuard {
    session: Arc<Session>,
    inner: EventStream,
}

impl Stream for SubscriptionGuard {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            session.release_subscription().await;
        });
    }
}
