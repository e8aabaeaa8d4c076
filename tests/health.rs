//! Unit tests for the HTTP health endpoint.
//! Spins up the IPC server on a random port and sends an HTTP GET /health request.

use std::sync::Arc;
use taskd::{config::TaskdConfig, ipc::event::EventBroadcaster, tasks::TaskStore, AppContext};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Find a free local port by binding to port 0.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Build a minimal AppContext on a random port for testing.
fn make_test_ctx(dir: &TempDir, port: u16) -> Arc<AppContext> {
    let config = Arc::new(TaskdConfig::new(
        Some(port),
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        None,
    ));
    Arc::new(AppContext {
        config,
        store: Arc::new(TaskStore::new()),
        broadcaster: Arc::new(EventBroadcaster::new()),
        started_at: std::time::Instant::now(),
        auth_token: String::new(),
    })
}

#[tokio::test]
async fn health_endpoint_reports_status_and_task_count() {
    let dir = tempfile::tempdir().unwrap();
    let port = find_free_port();
    let ctx = make_test_ctx(&dir, port);

    ctx.store.create("one".into(), None);
    ctx.store.create("two".into(), None);

    let ctx_server = ctx.clone();
    tokio::spawn(async move {
        taskd::ipc::run(ctx_server).await.ok();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"));

    let body = response.split("\r\n\r\n").nth(1).expect("no body");
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["tasks"], 2);
    assert_eq!(json["port"], port);
}
