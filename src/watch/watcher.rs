//! Background watcher task.

use super::{Debouncer, WatchEvent, WatchEventSink, accepts};
use crate::config::WatchConfig;
use crate::{Error, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Capacity of the raw event channel.
const CHANNEL_CAPACITY: usize = 256;

/// Watches a workspace's trees and feeds debounced events to a sink.
///
/// Must be started from inside a tokio runtime. Dropping the watcher stops
/// it without applying events still waiting out their debounce window; use
/// [`ShelfWatcher::shutdown`] to apply them first.
pub struct ShelfWatcher {
    handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    roots: Vec<PathBuf>,
}

impl ShelfWatcher {
    /// Starts watching the sink's roots.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no current tokio runtime or a root cannot
    /// be watched.
    pub fn start<S: WatchEventSink>(sink: Arc<S>, config: WatchConfig) -> Result<Self> {
        tokio::runtime::Handle::try_current().map_err(|e| Error::operation("start_watcher", e))?;

        let roots = sink.watch_roots();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) => {
                    for event in WatchEvent::from_notify(&event) {
                        if let Err(e) = tx.blocking_send(event) {
                            tracing::error!(error = %e, "Failed to forward watch event");
                        }
                    }
                },
                Err(e) => tracing::warn!(error = %e, "Watcher reported an error"),
            },
            notify::Config::default(),
        )
        .map_err(|e| Error::operation("create_watcher", e))?;

        for root in &roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| Error::operation("watch_root", format!("{}: {e}", root.display())))?;
            tracing::info!(root = %root.display(), "Watching");
        }

        Ok(Self::spawn(rx, sink, roots, config, Some(watcher)))
    }

    /// Spawns the event loop over an existing channel.
    pub(crate) fn spawn<S: WatchEventSink>(
        rx: mpsc::Receiver<WatchEvent>,
        sink: Arc<S>,
        roots: Vec<PathBuf>,
        config: WatchConfig,
        watcher: Option<RecommendedWatcher>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let loop_roots = roots.clone();
        let handle = tokio::spawn(async move {
            // Keep the watcher alive for the duration of the task.
            let _watcher = watcher;
            run(rx, shutdown_rx, sink.as_ref(), &loop_roots, config).await;
        });
        Self {
            handle: Some(handle),
            shutdown_tx: Some(shutdown_tx),
            roots,
        }
    }

    /// Roots being watched.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Returns `true` while the event loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the loop after applying any pending events, and waits for it.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Watcher task ended abnormally");
            }
        }
    }

    /// Stops the loop immediately.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Watcher task aborted");
        }
    }
}

impl Drop for ShelfWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<S: WatchEventSink>(
    mut rx: mpsc::Receiver<WatchEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
    sink: &S,
    roots: &[PathBuf],
    config: WatchConfig,
) {
    let mut debouncer = Debouncer::new(config.debounce());
    loop {
        let deadline = debouncer.next_deadline();
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) if accepts(roots, &event, config.max_depth) => {
                    tracing::trace!(path = %event.path.display(), kind = ?event.kind, "Queued");
                    debouncer.push(event, Instant::now());
                },
                Some(event) => {
                    tracing::trace!(path = %event.path.display(), "Ignored");
                },
                None => {
                    tracing::debug!("Watch channel closed");
                    break;
                },
            },
            () = wait_for(deadline) => {
                for event in debouncer.drain_due(Instant::now()) {
                    apply(sink, &event);
                }
            },
            _ = &mut shutdown_rx => {
                tracing::debug!("Watcher received shutdown");
                break;
            },
        }
    }

    for event in debouncer.flush() {
        apply(sink, &event);
    }
    tracing::debug!("Watcher loop exiting");
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn apply<S: WatchEventSink>(sink: &S, event: &WatchEvent) {
    let outcome = sink.apply(event);
    tracing::debug!(
        path = %event.path.display(),
        kind = ?event.kind,
        target = ?outcome.target,
        changed = outcome.changed,
        "Applied watch event"
    );
    metrics::counter!("watch_events_applied_total", "changed" => outcome.changed.to_string())
        .increment(1);
}
