//! Append-only, replayable per-job event log.
//!
//! Unlike a broadcast channel, a [`JobLog`] keeps every event it has
//! accepted, so an observer can attach at any time and still see the job
//! through to its terminal event. Observers wait on a `tokio::sync::watch`
//! channel that carries the current log length; each [`JobSubscription`]
//! keeps its own cursor into the log.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::Stream;
use groundmark_core::batch::BatchSummary;
use tokio::sync::watch;

use crate::event::JobEvent;

// ---------------------------------------------------------------------------
// JobLog
// ---------------------------------------------------------------------------

struct Inner {
    events: Vec<JobEvent>,
    /// Index of the terminal event once appended.
    terminal: Option<usize>,
    summary: BatchSummary,
}

pub struct JobLog {
    inner: Mutex<Inner>,
    version: watch::Sender<usize>,
}

impl JobLog {
    /// Create an empty log for a job with `total` items.
    pub fn new(total: usize) -> Arc<Self> {
        let (version, _) = watch::channel(0);
        Arc::new(Self {
            inner: Mutex::new(Inner {
                events: Vec::new(),
                terminal: None,
                summary: BatchSummary::new(total),
            }),
            version,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Mutations are a single push plus counter bump; poison is harmless.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an event and wake every observer.
    ///
    /// Returns `false` (and drops the event) once the terminal event has
    /// been appended.
    pub fn append(&self, event: JobEvent) -> bool {
        let len = {
            let mut inner = self.lock();
            if inner.terminal.is_some() {
                tracing::warn!(kind = event.kind(), "Event appended after job completion, dropped");
                return false;
            }
            if let JobEvent::ImageDone { status, .. } = &event {
                inner.summary.record(*status);
            }
            if event.is_terminal() {
                inner.terminal = Some(inner.events.len());
            }
            inner.events.push(event);
            inner.events.len()
        };
        self.version.send_replace(len);
        true
    }

    /// Number of events accepted so far.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the terminal event has been appended.
    pub fn is_closed(&self) -> bool {
        self.lock().terminal.is_some()
    }

    /// Counts derived from the `image_done` events seen so far.
    pub fn summary(&self) -> BatchSummary {
        self.lock().summary
    }

    /// Copy of every event accepted so far.
    pub fn snapshot(&self) -> Vec<JobEvent> {
        self.lock().events.clone()
    }

    fn get(&self, index: usize) -> Option<JobEvent> {
        self.lock().events.get(index).cloned()
    }

    /// Attach a new observer.
    ///
    /// The observer first receives an `init` snapshot of the counters, then
    /// every event appended after this call. If the job has already
    /// completed, the observer receives `init` followed by the terminal
    /// event.
    pub fn subscribe(self: &Arc<Self>) -> JobSubscription {
        let rx = self.version.subscribe();
        let inner = self.lock();
        let cursor = inner.terminal.unwrap_or(inner.events.len());
        let init = JobEvent::init(&inner.summary);
        drop(inner);

        JobSubscription {
            log: Arc::clone(self),
            rx,
            cursor,
            pending_init: Some(init),
            done: false,
        }
    }
}

// ---------------------------------------------------------------------------
// JobSubscription
// ---------------------------------------------------------------------------

/// One observer's view of a [`JobLog`].
///
/// Dropping a subscription has no effect on the job.
pub struct JobSubscription {
    log: Arc<JobLog>,
    rx: watch::Receiver<usize>,
    cursor: usize,
    pending_init: Option<JobEvent>,
    done: bool,
}

impl JobSubscription {
    /// Wait for the next event. Returns `None` after the terminal event has
    /// been delivered.
    pub async fn next(&mut self) -> Option<JobEvent> {
        if let Some(init) = self.pending_init.take() {
            return Some(init);
        }
        if self.done {
            return None;
        }
        loop {
            if let Some(event) = self.log.get(self.cursor) {
                self.cursor += 1;
                self.done = event.is_terminal();
                return Some(event);
            }
            // The sender lives inside the log we hold, so this only fails if
            // the log is being torn down.
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Convert into a `Stream` that ends after the terminal event.
    pub fn into_stream(self) -> impl Stream<Item = JobEvent> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|event| (event, sub))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
