//! Per-file trailing debounce.

use super::{WatchEvent, WatchEventKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Holds back events until a file has been quiet for the window.
///
/// Each file has its own timer; a new event for the file replaces the
/// pending one and restarts the timer. Events for different files never
/// merge into a batch.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, (WatchEventKind, Instant)>,
}

impl Debouncer {
    /// Creates a debouncer with the given quiet window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Records an event observed at `now`.
    pub fn push(&mut self, event: WatchEvent, now: Instant) {
        self.pending.insert(event.path, (event.kind, now + self.window));
    }

    /// Removes and returns every event whose window has elapsed.
    pub fn drain_due(&mut self, now: Instant) -> Vec<WatchEvent> {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        let mut events: Vec<(Instant, WatchEvent)> = due
            .into_iter()
            .filter_map(|path| {
                self.pending
                    .remove(&path)
                    .map(|(kind, deadline)| (deadline, WatchEvent { path, kind }))
            })
            .collect();
        events.sort_by_key(|(deadline, _)| *deadline);
        events.into_iter().map(|(_, event)| event).collect()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, deadline)| *deadline).min()
    }

    /// Removes and returns everything still pending.
    pub fn flush(&mut self) -> Vec<WatchEvent> {
        self.pending
            .drain()
            .map(|(path, (kind, _))| WatchEvent { path, kind })
            .collect()
    }

    /// Number of files with a pending event.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
