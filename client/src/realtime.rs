//! Realtime change consumption: SSE parsing, debounced refresh.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ChangeNotice};

pub const REFRESH_DEBOUNCE: Duration = Duration::from_secs(1);

const RECONNECT_BASE: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Trailing-edge debouncer: the action runs once per burst, after the
/// configured quiet period.
pub struct Debouncer {
    tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Debouncer {
    pub fn spawn<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (tx, mut rx) = mpsc::channel::<()>(8);
        let handle = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Keep resetting the timer while triggers arrive.
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => break,
                        more = rx.recv() => {
                            if more.is_none() {
                                return;
                            }
                        }
                    }
                }
                action().await;
            }
        });
        Self { tx, handle }
    }

    /// Notes one trigger. A full queue means a run is already pending,
    /// so the trigger can be dropped.
    pub fn trigger(&self) {
        let _ = self.tx.try_send(());
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Extracts the payload of one SSE `data:` line.
pub fn parse_sse_data(line: &str) -> Option<ChangeNotice> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    serde_json::from_str(payload).ok()
}

/// Consumes the server's change stream and reports each parsed change.
/// Reconnects with exponential backoff when the stream drops.
pub struct ChangeListener {
    handle: JoinHandle<()>,
}

impl ChangeListener {
    pub fn spawn<F>(api: Arc<ApiClient>, on_change: F) -> Self
    where
        F: Fn(ChangeNotice) + Send + Sync + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut backoff = RECONNECT_BASE;
            loop {
                match api.open_change_stream().await {
                    Ok(response) => {
                        backoff = RECONNECT_BASE;
                        consume_stream(response, &on_change).await;
                        tracing::debug!("change stream ended, reconnecting");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to open change stream");
                    }
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_MAX);
            }
        });
        Self { handle }
    }
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn consume_stream<F>(response: reqwest::Response, on_change: &F)
where
    F: Fn(ChangeNotice) + Send + Sync,
{
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::debug!(error = %err, "change stream read failed");
                return;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        // Process complete lines; keep a partial trailing line buffered.
        while let Some(newline) = buffer.find('\n') {
            let line = buffer[..newline].trim_end_matches('\r').to_string();
            buffer.drain(..=newline);
            if let Some(change) = parse_sse_data(&line) {
                on_change(change);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn parse_sse_data_reads_change_lines() {
        let change = parse_sse_data(r#"data: {"store":"activity","op":"insert","id":"abc"}"#)
            .expect("parse");
        assert_eq!(change.store, "activity");
        assert_eq!(change.op, "insert");
        assert_eq!(change.id, "abc");
    }

    #[test]
    fn parse_sse_data_ignores_non_data_lines() {
        assert!(parse_sse_data("event: change").is_none());
        assert!(parse_sse_data(": keep-alive").is_none());
        assert!(parse_sse_data("data:").is_none());
        assert!(parse_sse_data("data: not json").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_coalesces_bursts() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let debouncer = Debouncer::spawn(Duration::from_secs(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        for _ in 0..5 {
            debouncer.trigger();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // A second burst runs the action once more.
        debouncer.trigger();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
