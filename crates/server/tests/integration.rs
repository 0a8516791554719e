//! Drives the full REST surface of a spawned `replay-server` app over
//! real HTTP, against an ephemeral port and a small on-disk CSV
//! catalogue.

use std::io::Write;
use std::net::SocketAddr;

use replay_server::config::{ConfigOverrides, ReplayConfig};

async fn spawn_app(catalogue_csv: &str) -> (SocketAddr, tempfile::NamedTempFile) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(catalogue_csv.as_bytes()).unwrap();

    let config = ReplayConfig::load(ConfigOverrides {
        bind_addr: Some("127.0.0.1:0".to_string()),
        catalogue_source: Some(file.path().to_string_lossy().to_string()),
        publish_tick_millis: Some(20),
        session_ttl_millis: None,
        outbound_capacity: Some(16),
    })
    .unwrap();

    let router = replay_server::build(&config).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, file)
}

fn sample_csv() -> &'static str {
    "timestamp_millis,symbol,price\n0,AAA,10\n100,BBB,11\n250,CCC,12\n"
}

#[tokio::test]
async fn full_session_lifecycle_over_http() {
    let (addr, _file) = spawn_app(sample_csv()).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let session_id = client
        .post(format!("{base}/mktdata/session"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!session_id.is_empty());

    let status = client
        .put(format!("{base}/mktdata/session/start/{session_id}"))
        .send()
        .await
        .unwrap();
    assert!(status.status().is_success());

    let status = client
        .put(format!("{base}/mktdata/session/speed/{session_id}/2.5"))
        .send()
        .await
        .unwrap();
    assert!(status.status().is_success());

    let status = client
        .put(format!("{base}/mktdata/session/stop/{session_id}"))
        .send()
        .await
        .unwrap();
    assert!(status.status().is_success());

    let status = client
        .put(format!("{base}/mktdata/session/rewind/{session_id}"))
        .send()
        .await
        .unwrap();
    assert!(status.status().is_success());
}

#[tokio::test]
async fn unknown_session_returns_404() {
    let (addr, _file) = spawn_app(sample_csv()).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let response = client
        .put(format!(
            "{base}/mktdata/session/start/00000000-0000-0000-0000-000000000000"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_speed_returns_400() {
    let (addr, _file) = spawn_app(sample_csv()).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let session_id = client
        .post(format!("{base}/mktdata/session"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let response = client
        .put(format!("{base}/mktdata/session/speed/{session_id}/-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscribe_streams_events_over_sse() {
    let (addr, _file) = spawn_app(sample_csv()).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let session_id = client
        .post(format!("{base}/mktdata/session"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let mut response = client
        .get(format!("{base}/mktdata/session/subscribe/{session_id}"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    client
        .put(format!("{base}/mktdata/session/start/{session_id}"))
        .send()
        .await
        .unwrap();

    let mut body = Vec::new();
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(std::time::Duration::from_millis(500), response.chunk()).await
        {
            Ok(Ok(Some(chunk))) => {
                body.extend_from_slice(&chunk);
                if body.windows(b"AAA".len()).any(|w| w == b"AAA") {
                    break;
                }
            }
            _ => continue,
        }
    }

    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("AAA"), "expected first event in SSE body, got: {text}");

    let data_line = text
        .lines()
        .find(|line| line.starts_with("data:"))
        .expect("no SSE data frame in body");
    let event: serde_json::Value =
        serde_json::from_str(data_line.trim_start_matches("data:").trim()).unwrap();
    assert_eq!(event["id"], 1);
    assert_eq!(event["timestamp"], 0);
    assert_eq!(event["symbol"], "AAA");
    assert!(
        event.get("payload").is_none(),
        "domain fields must be flattened, not nested under payload: {event}"
    );
    assert!(
        event.get("timestamp_millis").is_none(),
        "wire schema must use 'timestamp', not 'timestamp_millis': {event}"
    );
}

#[tokio::test]
async fn second_subscriber_is_rejected_with_409() {
    let (addr, _file) = spawn_app(sample_csv()).await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let session_id = client
        .post(format!("{base}/mktdata/session"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let _first = client
        .get(format!("{base}/mktdata/session/subscribe/{session_id}"))
        .send()
        .await
        .unwrap();

    let second = client
        .get(format!("{base}/mktdata/session/subscribe/{session_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);
}
