#![allow(dead_code)]

use std::{
    future::Future,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpStream},
    time::{sleep, timeout, Instant},
};

/// Short enough to keep the suite quick, long enough for loopback peers.
pub const IDLE: Duration = Duration::from_millis(200);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Log lines written while a [`capture_warnings`] guard is alive.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Collects WARN and above on this thread until the guard drops. Tasks
/// spawned from a `#[tokio::test]` run on the same thread, so their events
/// are caught too.
pub fn capture_warnings() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

pub async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A port nothing is listening on.
pub async fn closed_port() -> u16 {
    let (listener, port) = listener().await;
    drop(listener);
    port
}

/// Reads whatever is available in one go.
pub async fn read_chunk(peer: &mut TcpStream) -> String {
    let mut buf = vec![0u8; 4096];
    let n = timeout(Duration::from_secs(5), peer.read(&mut buf))
        .await
        .expect("peer timed out waiting for data")
        .unwrap();
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

/// True if nothing arrives within `window`.
pub async fn stays_quiet(peer: &mut TcpStream, window: Duration) -> bool {
    let mut buf = [0u8; 64];
    timeout(window, peer.read(&mut buf)).await.is_err()
}

/// Polls `check` until it yields a value, failing the test after a few
/// seconds.
pub async fn eventually<T, F, Fut>(mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(value) = check().await {
            return value;
        }
        assert!(Instant::now() < deadline, "condition not met in time");
        sleep(Duration::from_millis(20)).await;
    }
}
