//! Playback metrics events.
//!
//! A typed observer with a single event kind: listeners subscribe for
//! [`PlaybackMetrics`] and are invoked synchronously in registration
//! order. A panicking listener is caught and logged; it never aborts the
//! emitting call.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

/// Per-utterance playback record, emitted after decode and before the
/// first frame. Cost stays zero: no paid synthesis happens here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackMetrics {
    pub characters: usize,
    pub duration_ms: u64,
    pub cost_usd: f64,
}

/// Handle returned by [`EventEmitter::subscribe`]; pass it back to
/// [`EventEmitter::unsubscribe`] to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback = Box<dyn Fn(&PlaybackMetrics) + Send + Sync>;

#[derive(Default)]
pub struct EventEmitter {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Callback)>>,
}

// Listener callbacks have no useful Debug form.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.listeners.lock().map(|l| l.len()).unwrap_or(0);
        f.debug_struct("EventEmitter").field("listeners", &count).finish()
    }
}

impl EventEmitter {
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PlaybackMetrics) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Box::new(callback)));
        }
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(id, _)| *id != subscription.0);
        }
    }

    /// Deliver `metrics` to every listener in registration order.
    pub fn emit(&self, metrics: &PlaybackMetrics) {
        let Ok(listeners) = self.listeners.lock() else {
            return;
        };
        for (id, callback) in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| callback(metrics))).is_err() {
                warn!(listener = *id, "metrics listener panicked");
            }
        }
    }
}
