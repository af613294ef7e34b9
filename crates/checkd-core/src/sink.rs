//! Metrics sink seam and the plaintext Graphite adapter.
//!
//! The dispatcher only consumes the "enqueue numeric sample" interface; any
//! backend that can take `(dotted.path, value)` pairs fits behind
//! [`MetricsSink`]. [`GraphiteSink`] ships samples over TCP in the plaintext
//! protocol (`path value timestamp\n`), buffered through a channel and
//! flushed by a background task.

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Destination for numeric check results.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Queue one sample for delivery. Fire-and-forget: delivery failures are
    /// the sink's problem, never the caller's.
    async fn enqueue(&self, path: &str, value: f64);

    /// Restart the background flush loop if it is not running.
    async fn ensure_started(&self);
}

struct Sample {
    path: String,
    value: f64,
    timestamp: i64,
}

struct FlushWorker {
    tx: mpsc::UnboundedSender<Sample>,
    handle: JoinHandle<()>,
}

/// Plaintext-protocol Graphite forwarder.
pub struct GraphiteSink {
    addr: String,
    worker: Mutex<Option<FlushWorker>>,
}

impl GraphiteSink {
    /// `addr` is `host:port` of the Graphite line receiver.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            worker: Mutex::new(None),
        }
    }

    fn spawn_worker(addr: String) -> FlushWorker {
        let (tx, mut rx) = mpsc::unbounded_channel::<Sample>();
        let handle = tokio::spawn(async move {
            let mut conn: Option<TcpStream> = None;
            while let Some(sample) = rx.recv().await {
                if conn.is_none() {
                    match TcpStream::connect(&addr).await {
                        Ok(stream) => conn = Some(stream),
                        Err(err) => {
                            warn!(addr = %addr, error = %err, "graphite connect failed; sample dropped");
                            continue;
                        }
                    }
                }
                let line = format!("{} {} {}\n", sample.path, sample.value, sample.timestamp);
                if let Some(stream) = conn.as_mut() {
                    if let Err(err) = stream.write_all(line.as_bytes()).await {
                        warn!(addr = %addr, error = %err, "graphite write failed; reconnecting on next sample");
                        conn = None;
                    }
                }
            }
        });
        FlushWorker { tx, handle }
    }
}

#[async_trait]
impl MetricsSink for GraphiteSink {
    async fn enqueue(&self, path: &str, value: f64) {
        let worker = self.worker.lock().await;
        match worker.as_ref() {
            Some(w) if !w.handle.is_finished() => {
                let sample = Sample {
                    path: path.to_string(),
                    value,
                    timestamp: Utc::now().timestamp(),
                };
                // Receiver outlives the sender here; a send can only fail if
                // the worker died between the check and now, which the next
                // ensure_started repairs.
                let _ = w.tx.send(sample);
            }
            _ => {
                debug!(path = %path, "flush loop not running; sample dropped");
            }
        }
    }

    async fn ensure_started(&self) {
        let mut worker = self.worker.lock().await;
        let running = worker
            .as_ref()
            .map(|w| !w.handle.is_finished())
            .unwrap_or(false);
        if !running {
            info!(addr = %self.addr, "starting graphite flush loop");
            *worker = Some(Self::spawn_worker(self.addr.clone()));
        }
    }
}
