//! End-to-end scenarios over a registry + session + scheduler, with no
//! transport layer involved — exercises the same concrete catalogue and
//! control sequences a REST client would drive.

use std::sync::Arc;
use std::time::Duration;

use replay_core::catalogue::{Catalogue, CatalogueLoader, RawRow};
use replay_core::error::{CatalogueResult, SessionError};
use replay_core::registry::SessionRegistry;
use replay_core::session::SessionState;
use tokio_stream::StreamExt;

struct VecLoader(std::vec::IntoIter<(i64, serde_json::Value)>);

impl VecLoader {
    fn new(rows: Vec<(i64, serde_json::Value)>) -> Self {
        VecLoader(rows.into_iter())
    }
}

impl CatalogueLoader for VecLoader {
    fn next_row(&mut self) -> Option<CatalogueResult<RawRow>> {
        self.0.next().map(|(timestamp_millis, payload)| {
            Ok(RawRow {
                timestamp_millis,
                payload,
            })
        })
    }
}

fn three_event_catalogue() -> Arc<Catalogue> {
    let mut loader = VecLoader::new(vec![
        (0, serde_json::json!({"symbol": "AAA"})),
        (100, serde_json::json!({"symbol": "BBB"})),
        (250, serde_json::json!({"symbol": "CCC"})),
    ]);
    Arc::new(Catalogue::load(&mut loader).unwrap())
}

#[tokio::test]
async fn basic_replay_delivers_events_in_catalogue_order() {
    let catalogue = three_event_catalogue();
    let registry = SessionRegistry::new(catalogue, 16, 25);
    let session = registry.create();

    let mut stream = session.subscribe().await.unwrap();
    session.start().await.unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("event did not arrive in time")
            .expect("stream closed early");
        ids.push(event.id);
    }
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(session.state().await, SessionState::Completed);
}

#[tokio::test]
async fn speed_up_delivers_events_faster_than_real_time() {
    let catalogue = three_event_catalogue();
    let registry = SessionRegistry::new(catalogue, 16, 25);
    let session = registry.create();

    let mut stream = session.subscribe().await.unwrap();
    session.set_speed(4.0).await.unwrap();
    session.start().await.unwrap();

    let started = std::time::Instant::now();
    for _ in 0..3 {
        stream.next().await.expect("stream closed early");
    }
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn stop_pauses_and_rewind_resets() {
    let catalogue = three_event_catalogue();
    let registry = SessionRegistry::new(catalogue, 16, 20);
    let session = registry.create();

    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    session.stop().await.unwrap();
    let (cursor_after_stop, _, _) = session.snapshot().await;
    assert!(cursor_after_stop > 0);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let (cursor_after_wait, _, _) = session.snapshot().await;
    assert_eq!(
        cursor_after_stop, cursor_after_wait,
        "cursor must not move while stopped"
    );

    session.rewind().await.unwrap();
    let (cursor, sim_clock, _) = session.snapshot().await;
    assert_eq!(cursor, 0);
    assert_eq!(sim_clock, 0);
    assert_eq!(session.state().await, SessionState::Stopped);
}

#[tokio::test]
async fn jump_to_then_resume_emits_only_from_the_new_position() {
    let catalogue = three_event_catalogue();
    let registry = SessionRegistry::new(catalogue, 16, 20);
    let session = registry.create();

    let mut stream = session.subscribe().await.unwrap();
    session.jump_to(3).await.unwrap();
    session.start().await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("event did not arrive")
        .expect("stream closed early");
    assert_eq!(event.id, 3);
    assert_eq!(session.state().await, SessionState::Completed);
}

#[tokio::test]
async fn forward_skips_without_emitting() {
    let catalogue = three_event_catalogue();
    let registry = SessionRegistry::new(catalogue, 16, 20);
    let session = registry.create();

    let mut stream = session.subscribe().await.unwrap();
    session.forward(2).await.unwrap();
    session.start().await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("event did not arrive")
        .expect("stream closed early");
    assert_eq!(event.id, 3);
}

#[tokio::test]
async fn registry_rejects_unknown_session_id() {
    let catalogue = three_event_catalogue();
    let registry = SessionRegistry::new(catalogue, 16, 20);
    let err = registry.get("00000000-0000-0000-0000-000000000000").unwrap_err();
    assert!(matches!(err, SessionError::UnknownSession(_)));

    let err = registry.get("not-a-uuid").unwrap_err();
    assert!(matches!(err, SessionError::UnknownSession(_)));
}

#[tokio::test]
async fn idle_sweep_evicts_and_removes_from_the_registry() {
    let catalogue = three_event_catalogue();
    let registry = Arc::new(SessionRegistry::new(catalogue, 16, 20));
    let session = registry.create();
    let id = session.id.to_string();

    let last_access = session.last_access_millis().await;
    registry
        .evict_idle(last_access + 1_000, Duration::from_millis(500))
        .await;

    assert_eq!(registry.len(), 0);
    assert!(matches!(
        registry.get(&id),
        Err(SessionError::UnknownSession(_))
    ));
}

#[tokio::test]
async fn second_concurrent_subscriber_is_rejected() {
    let catalogue = three_event_catalogue();
    let registry = SessionRegistry::new(catalogue, 16, 20);
    let session = registry.create();

    let _first = session.subscribe().await.unwrap();
    assert!(matches!(
        session.subscribe().await,
        Err(SessionError::AlreadySubscribed(_))
    ));
}
