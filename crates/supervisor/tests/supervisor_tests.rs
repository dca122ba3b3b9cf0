//! Supervisor integration tests
//!
//! Drives a full supervisor (real callback listener, real stub server
//! process, fake capabilities) through the bind/unbind lifecycle over
//! actual loopback HTTP, and checks the cleanup guarantees around stop.
//!
//! Run with: `cargo test -p supervisor --test supervisor_tests`

use common::test_utils::{
    FakeBacklight, FakeSleepInhibitor, UnreadableBacklight, sample_bind_event, with_timeout,
    write_stub_server,
};
use serde_json::json;
use supervisor::process::ServerProcess;
use supervisor::supervisor::ServerSupervisor;
use supervisor::system::SystemState;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

struct Harness {
    // Keeps the stub executable and config alive for the test's duration
    _dir: TempDir,
    inhibitor: FakeSleepInhibitor,
    backlight: FakeBacklight,
    supervisor: ServerSupervisor,
}

fn harness(initial_brightness: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let executable = write_stub_server(dir.path());
    let inhibitor = FakeSleepInhibitor::new();
    let backlight = FakeBacklight::new(initial_brightness);

    let system = SystemState::new(Box::new(inhibitor.clone()), Box::new(backlight.clone()));
    let process = ServerProcess::new(executable, dir.path().join("config.ini"), dir.path());

    Harness {
        _dir: dir,
        inhibitor,
        backlight,
        supervisor: ServerSupervisor::new(system, process),
    }
}

async fn post(port: u16, path: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let raw = format!(
        "POST {} HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Length: {}\r\n\r\n{}",
        path,
        body.len(),
        body
    );
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response.lines().next().unwrap_or_default().to_string()
}

fn bind_body() -> String {
    serde_json::to_string(&sample_bind_event()).unwrap()
}

fn unbind_body(surprise: &str) -> String {
    json!({
        "vendor_id": "046d",
        "product_id": "c52b",
        "client_ip": "10.0.0.5",
        "connection_id": "1",
        "surprise_unbound": surprise,
    })
    .to_string()
}

#[tokio::test]
async fn full_bind_unbind_scenario() {
    let mut h = harness("4096\n");

    h.supervisor.start().await.unwrap();
    assert!(h.supervisor.is_up().await);
    let port = h.supervisor.listener_port().unwrap();
    assert_eq!(h.supervisor.process_callback_port().await, Some(port));
    assert_eq!(h.supervisor.client_ip().await, None);

    // Device attached: client tracked, host kept awake, display dimmed
    let status = with_timeout(post(port, "/onBind", &bind_body())).await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(h.supervisor.client_ip().await, Some("10.0.0.5".to_string()));
    assert!(h.inhibitor.is_inhibited());
    assert_eq!(h.backlight.level(), "0");

    // Device detached: everything undone, server restarted on the same port
    let status = with_timeout(post(port, "/onUnbind", &unbind_body("0"))).await;
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert_eq!(h.supervisor.client_ip().await, None);
    assert!(!h.inhibitor.is_inhibited());
    assert_eq!(h.backlight.level(), "4096\n");
    assert!(h.supervisor.is_up().await);
    assert_eq!(h.supervisor.process_callback_port().await, Some(port));

    h.supervisor.stop().await;
}

#[tokio::test]
async fn surprise_unbind_takes_the_same_path() {
    let mut h = harness("2048");

    h.supervisor.start().await.unwrap();
    let port = h.supervisor.listener_port().unwrap();

    with_timeout(post(port, "/onBind", &bind_body())).await;
    let status = with_timeout(post(port, "/onUnbind", &unbind_body("1"))).await;
    assert_eq!(status, "HTTP/1.1 200 OK");

    assert_eq!(h.supervisor.client_ip().await, None);
    assert!(!h.inhibitor.is_inhibited());
    assert_eq!(h.backlight.level(), "2048");

    h.supervisor.stop().await;
}

#[tokio::test]
async fn stop_resets_everything_even_mid_session() {
    let mut h = harness("813\n");

    h.supervisor.start().await.unwrap();
    let port = h.supervisor.listener_port().unwrap();
    with_timeout(post(port, "/onBind", &bind_body())).await;

    // Stop during an active session must still reset all state
    h.supervisor.stop().await;
    assert!(!h.supervisor.is_up().await);
    assert_eq!(h.supervisor.client_ip().await, None);
    assert!(!h.inhibitor.is_inhibited());
    assert_eq!(h.backlight.level(), "813\n");
    assert_eq!(h.supervisor.listener_port(), None);
    assert_eq!(h.supervisor.process_callback_port().await, None);
}

#[tokio::test]
async fn start_stop_sequences_always_end_clean() {
    let mut h = harness("100");

    for _ in 0..3 {
        h.supervisor.start().await.unwrap();
        assert!(h.supervisor.is_up().await);

        h.supervisor.stop().await;
        assert!(!h.supervisor.is_up().await);
        assert_eq!(h.supervisor.client_ip().await, None);
        assert!(!h.inhibitor.is_inhibited());
        assert_eq!(h.backlight.level(), "100");
    }

    // Stop without start is harmless too
    h.supervisor.stop().await;
    assert!(!h.supervisor.is_up().await);
}

#[tokio::test]
async fn malformed_bind_leaves_state_unchanged() {
    let mut h = harness("4096\n");

    h.supervisor.start().await.unwrap();
    let port = h.supervisor.listener_port().unwrap();

    let body = r#"{"product_id":"c52b","client_ip":"10.0.0.5","connection_id":"1"}"#;
    let status = with_timeout(post(port, "/onBind", body)).await;
    assert_eq!(status, "HTTP/1.1 400 Bad Request");

    assert_eq!(h.supervisor.client_ip().await, None);
    assert!(!h.inhibitor.is_inhibited());
    assert_eq!(h.inhibitor.inhibit_calls(), 0);
    assert_eq!(h.backlight.level(), "4096\n");
    assert!(h.supervisor.is_up().await);

    h.supervisor.stop().await;
}

#[tokio::test]
async fn dim_failure_does_not_block_sleep_inhibition() {
    let dir = tempfile::tempdir().unwrap();
    let executable = write_stub_server(dir.path());
    let inhibitor = FakeSleepInhibitor::new();

    let system = SystemState::new(Box::new(inhibitor.clone()), Box::new(UnreadableBacklight));
    let process = ServerProcess::new(executable, dir.path().join("config.ini"), dir.path());
    let mut supervisor = ServerSupervisor::new(system, process);

    supervisor.start().await.unwrap();
    let port = supervisor.listener_port().unwrap();

    // Brightness device inaccessible: the bind fails visibly...
    let status = with_timeout(post(port, "/onBind", &bind_body())).await;
    assert_eq!(status, "HTTP/1.1 500 Internal Server Error");

    // ...but sleep inhibition and client tracking already happened
    assert!(inhibitor.is_inhibited());
    assert_eq!(supervisor.client_ip().await, Some("10.0.0.5".to_string()));

    supervisor.stop().await;
    assert!(!inhibitor.is_inhibited());
}

#[tokio::test]
async fn failed_process_start_leaves_nothing_running() {
    let dir = tempfile::tempdir().unwrap();
    let inhibitor = FakeSleepInhibitor::new();
    let backlight = FakeBacklight::new("1");

    let system = SystemState::new(Box::new(inhibitor), Box::new(backlight));
    // Executable does not exist, so process start must fail
    let process = ServerProcess::new(
        dir.path().join("no-such-binary"),
        dir.path().join("config.ini"),
        dir.path(),
    );
    let mut supervisor = ServerSupervisor::new(system, process);

    assert!(supervisor.start().await.is_err());
    assert!(!supervisor.is_up().await);
    assert_eq!(supervisor.listener_port(), None);
}
