use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::FlowdeckError;
use crate::model::normalize::normalize;
use crate::model::{ConnectionSnapshot, StreamStatus};

/// Backoff between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Snapshot channel capacity. Bounded so a stalled consumer applies
/// backpressure to the reader instead of growing a queue; snapshots are
/// never dropped here because every accepted one must reach the diff stage.
const CHANNEL_CAPACITY: usize = 64;

/// Connection parameters for one push subscription. Changing any field
/// means tearing the subscription down and spawning a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Base URL of the telemetry endpoint, e.g. `http://127.0.0.1:9090`.
    pub base: String,
    pub access_key: Option<String>,
    /// Push interval requested from the core, in milliseconds.
    pub interval_ms: u64,
}

impl StreamConfig {
    pub fn stream_url(&self) -> String {
        let mut url = format!(
            "{}/connections/stream?interval={}",
            self.base.trim_end_matches('/'),
            self.interval_ms
        );
        if let Some(key) = &self.access_key {
            url.push_str("&access_key=");
            url.push_str(key);
        }
        url
    }
}

/// Lock-free status cell shared between the stream thread and its readers.
struct StatusCell(AtomicU8);

impl StatusCell {
    fn new(status: StreamStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    fn store(&self, status: StreamStatus) {
        self.0.store(status as u8, Ordering::Relaxed);
    }

    fn load(&self) -> StreamStatus {
        match self.0.load(Ordering::Relaxed) {
            0 => StreamStatus::Connecting,
            1 => StreamStatus::Live,
            2 => StreamStatus::Reconnecting,
            3 => StreamStatus::Paused,
            _ => StreamStatus::Idle,
        }
    }
}

/// A cancelable push subscription to `GET {base}/connections/stream`.
///
/// One background thread holds the HTTP response open and forwards each
/// payload line, normalized, over a bounded channel. Transport errors are
/// never surfaced to callers: the thread retries with a fixed backoff and
/// the only externally visible effect is the status label flipping to
/// `reconnecting`. Malformed payloads are swallowed and the status stays
/// `live`.
pub struct Subscription {
    cancel: Arc<AtomicBool>,
    status: Arc<StatusCell>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Subscription {
    /// Spawn the stream thread and return the subscription handle plus the
    /// snapshot receiver.
    pub fn spawn(
        config: StreamConfig,
    ) -> Result<(Self, Receiver<ConnectionSnapshot>), FlowdeckError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let status = Arc::new(StatusCell::new(StreamStatus::Connecting));
        let (tx, rx) = bounded(CHANNEL_CAPACITY);

        let thread_cancel = Arc::clone(&cancel);
        let thread_status = Arc::clone(&status);
        let handle = thread::Builder::new()
            .name("flowdeck-stream".into())
            .spawn(move || {
                stream_loop(&config, &tx, &thread_cancel, &thread_status);
            })
            .map_err(|e| FlowdeckError::Fatal(format!("spawn stream thread: {e}")))?;

        Ok((
            Self {
                cancel,
                status,
                handle: Some(handle),
            },
            rx,
        ))
    }

    pub fn status(&self) -> StreamStatus {
        self.status.load()
    }

    /// Tear the subscription down: no callback from the superseded thread
    /// runs after this returns, and the channel sender is dropped.
    pub fn cancel(mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Client for the long-lived stream request. No overall timeout: the
/// response stays open for the life of the subscription and the core pushes
/// at the configured interval, so cancellation is observed between payload
/// lines.
fn build_stream_client() -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder().timeout(None).build()
}

fn stream_loop(
    config: &StreamConfig,
    tx: &Sender<ConnectionSnapshot>,
    cancel: &AtomicBool,
    status: &StatusCell,
) {
    let client = match build_stream_client() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("stream client init failed: {e}");
            status.store(StreamStatus::Idle);
            return;
        }
    };
    let url = config.stream_url();

    while !cancel.load(Ordering::Relaxed) {
        match client.get(&url).send() {
            Ok(resp) if resp.status().is_success() => {
                read_stream(resp, tx, cancel, status);
            }
            Ok(resp) => {
                log::warn!("stream endpoint returned HTTP {}", resp.status().as_u16());
            }
            Err(e) => {
                log::warn!("stream connect failed: {e}");
            }
        }
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        status.store(StreamStatus::Reconnecting);
        thread::sleep(RECONNECT_DELAY);
    }

    status.store(StreamStatus::Idle);
}

/// Read payload lines until the transport drops or the subscription is
/// canceled. Returns to the caller's reconnect loop on any error.
fn read_stream(
    resp: reqwest::blocking::Response,
    tx: &Sender<ConnectionSnapshot>,
    cancel: &AtomicBool,
    status: &StatusCell,
) {
    let reader = BufReader::new(resp);
    for line in reader.lines() {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("stream read error: {e}");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        // Malformed payloads are dropped without touching the status.
        let Some(snapshot) = normalize(&line) else {
            continue;
        };
        status.store(StreamStatus::Live);

        // Blocking send with a cancel check: every accepted snapshot must
        // reach the aggregator, so backpressure stalls the reader rather
        // than dropping frames.
        let mut pending = snapshot;
        loop {
            match tx.send_timeout(pending, Duration::from_millis(100)) {
                Ok(()) => break,
                Err(crossbeam_channel::SendTimeoutError::Timeout(returned)) => {
                    if cancel.load(Ordering::Relaxed) {
                        return;
                    }
                    pending = returned;
                }
                Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_includes_interval() {
        let cfg = StreamConfig {
            base: "http://127.0.0.1:9090".to_string(),
            access_key: None,
            interval_ms: 1_000,
        };
        assert_eq!(
            cfg.stream_url(),
            "http://127.0.0.1:9090/connections/stream?interval=1000"
        );
    }

    #[test]
    fn stream_url_appends_access_key_and_trims_slash() {
        let cfg = StreamConfig {
            base: "http://127.0.0.1:9090/".to_string(),
            access_key: Some("secret".to_string()),
            interval_ms: 500,
        };
        assert_eq!(
            cfg.stream_url(),
            "http://127.0.0.1:9090/connections/stream?interval=500&access_key=secret"
        );
    }

    #[test]
    fn stream_client_builds() {
        assert!(build_stream_client().is_ok());
    }

    #[test]
    fn status_cell_round_trips() {
        let cell = StatusCell::new(StreamStatus::Connecting);
        for status in [
            StreamStatus::Connecting,
            StreamStatus::Live,
            StreamStatus::Reconnecting,
            StreamStatus::Paused,
            StreamStatus::Idle,
        ] {
            cell.store(status);
            assert_eq!(cell.load(), status);
        }
    }
}
