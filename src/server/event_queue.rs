//! Event queue — the bounded channel between a handler worker and the
//! orchestrator.
//!
//! Handlers (and the [`TaskUpdater`](super::task_updater::TaskUpdater)
//! façade) write [`StreamEvent`]s into the queue; the orchestrator holds
//! the single [`EventReceiver`] and drains it. The channel is bounded with
//! a block-on-full policy, which is what gives slow consumers backpressure
//! against fast handlers.
//!
//! Closing is explicit: the worker always closes the queue when the
//! handler returns or fails, and terminal [`TaskUpdater`] operations close
//! it early. Events enqueued after close are dropped with a warning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::A2AResult;
use crate::types::StreamEvent;

/// Writer half of a handler event queue. Cheap to clone; all clones share
/// the same channel and close state.
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    /// Dropped on close so the receiver observes end-of-stream once every
    /// in-flight send has finished.
    tx: std::sync::Mutex<Option<mpsc::Sender<StreamEvent>>>,
    closed: AtomicBool,
}

/// Reader half of a handler event queue, held by the orchestrator.
pub struct EventReceiver {
    rx: mpsc::Receiver<StreamEvent>,
}

impl EventQueue {
    /// Create a bounded queue with the given capacity.
    pub fn bounded(capacity: usize) -> (EventQueue, EventReceiver) {
        assert!(capacity > 0, "capacity must be greater than 0");
        let (tx, rx) = mpsc::channel(capacity);
        let queue = EventQueue {
            inner: Arc::new(QueueInner {
                tx: std::sync::Mutex::new(Some(tx)),
                closed: AtomicBool::new(false),
            }),
        };
        (queue, EventReceiver { rx })
    }

    /// Enqueue an event, waiting while the queue is full.
    ///
    /// Events enqueued after [`close`](Self::close) — or after the
    /// receiver has gone away — are silently dropped with a warning.
    pub async fn enqueue(&self, event: StreamEvent) -> A2AResult<()> {
        let sender = {
            let guard = self.inner.tx.lock().expect("event queue sender lock");
            guard.clone()
        };

        let Some(sender) = sender else {
            warn!(kind = event.kind(), "Queue is closed. Event will not be enqueued.");
            return Ok(());
        };

        if sender.send(event).await.is_err() {
            warn!("Event receiver dropped. Event will not be delivered.");
        }
        Ok(())
    }

    /// Close the queue, preventing future events from being enqueued.
    ///
    /// The receiver drains whatever was already buffered and then
    /// observes end-of-stream.
    pub fn close(&self) {
        debug!("Closing event queue.");
        self.inner.closed.store(true, Ordering::Release);
        let mut guard = self.inner.tx.lock().expect("event queue sender lock");
        *guard = None;
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl EventReceiver {
    /// Receive the next event, or `None` once the queue is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}
