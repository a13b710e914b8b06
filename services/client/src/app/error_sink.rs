//! services/client/src/app/error_sink.rs
//!
//! The process-wide error sink.
//!
//! Failures that no caller handled end up here, either reported explicitly or
//! through a task started with `ErrorSink::spawn`. The sink normalizes them into a
//! user-facing message and hands it to the single registered handler, which is
//! normally a `NotificationBus`.

use crate::error::{error_message, ClientError, ClientResult, FALLBACK_MESSAGE, UNEXPECTED_MESSAGE};
use chrono::{DateTime, Utc};
use habit_tracker_core::normalize::normalize_message;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// How many reports the sink remembers.
pub const ERROR_LOG_CAPACITY: usize = 50;

type Handler = Arc<dyn Fn(&str) + Send + Sync>;

/// One delivered report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub at: DateTime<Utc>,
    /// Where the failure came from, e.g. `report` or the name of a spawned task.
    pub context: String,
    pub message: String,
}

struct ActiveHandler {
    generation: u64,
    handler: Handler,
}

struct SinkInner {
    handler: Mutex<Option<ActiveHandler>>,
    next_generation: AtomicU64,
    log: Mutex<VecDeque<ErrorRecord>>,
}

/// Registry for the one active error handler. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ErrorSink {
    inner: Arc<SinkInner>,
}

impl Default for ErrorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSink {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SinkInner {
                handler: Mutex::new(None),
                next_generation: AtomicU64::new(1),
                log: Mutex::new(VecDeque::with_capacity(ERROR_LOG_CAPACITY)),
            }),
        }
    }

    /// Installs `handler` as the active handler until the returned registration is
    /// dropped. An existing handler is replaced, never stacked.
    pub fn register<F>(&self, handler: F) -> SinkRegistration
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let previous = self.inner.handler.lock().replace(ActiveHandler {
            generation,
            handler: Arc::new(handler),
        });
        if let Some(previous) = previous {
            warn!(
                "Error handler {} replaced by {}; only one handler may be active",
                previous.generation, generation
            );
        }
        SinkRegistration {
            sink: Arc::downgrade(&self.inner),
            generation,
        }
    }

    pub fn has_handler(&self) -> bool {
        self.inner.handler.lock().is_some()
    }

    /// Reports an error nobody else is going to show.
    pub fn report(&self, error: &ClientError) {
        // The normalizer must not take the reporter down with it.
        let message = catch_unwind(AssertUnwindSafe(|| error_message(Some(error))))
            .unwrap_or_else(|_| UNEXPECTED_MESSAGE.to_string());
        debug!("Reported: {}", error);
        self.deliver("report", message);
    }

    /// Reports a plain message. Blank text becomes the generic fallback.
    pub fn report_message(&self, message: &str) {
        let message = normalize_message(message).unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        self.deliver("report", message);
    }

    /// Runs a fire-and-forget task. An `Err` result or a panic is reported here
    /// instead of vanishing with the task.
    pub fn spawn<F, T>(&self, context: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ClientResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let sink = self.clone();
        let context = context.to_string();
        let task = tokio::spawn(future);
        tokio::spawn(async move {
            match task.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    let message = catch_unwind(AssertUnwindSafe(|| error_message(Some(&e))))
                        .unwrap_or_else(|_| UNEXPECTED_MESSAGE.to_string());
                    debug!("Task '{}' failed: {}", context, e);
                    sink.deliver(&context, message);
                }
                Err(join_error) if join_error.is_panic() => {
                    error!("Task '{}' panicked: {}", context, panic_text(join_error.into_panic()));
                    sink.deliver(&context, UNEXPECTED_MESSAGE.to_string());
                }
                Err(_) => debug!("Task '{}' was cancelled", context),
            }
        })
    }

    /// The most recent reports, oldest first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.inner.log.lock().iter().cloned().collect()
    }

    pub fn clear_errors(&self) {
        self.inner.log.lock().clear();
    }

    fn deliver(&self, context: &str, message: String) {
        {
            let mut log = self.inner.log.lock();
            if log.len() == ERROR_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(ErrorRecord {
                at: Utc::now(),
                context: context.to_string(),
                message: message.clone(),
            });
        }

        // Clone out so the handler runs without the lock held.
        let handler = self
            .inner
            .handler
            .lock()
            .as_ref()
            .map(|active| active.handler.clone());

        match handler {
            Some(handler) => {
                if catch_unwind(AssertUnwindSafe(|| handler(&message))).is_err() {
                    error!("Error handler panicked while showing: {}", message);
                }
            }
            None => error!("No error handler registered; dropping: {}", message),
        }
    }
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Keeps a handler installed. Dropping it removes the handler, unless it has
/// already been replaced by a newer registration.
#[must_use = "the handler is removed as soon as the registration is dropped"]
pub struct SinkRegistration {
    sink: Weak<SinkInner>,
    generation: u64,
}

impl SinkRegistration {
    /// True while this registration's handler is the active one.
    pub fn is_active(&self) -> bool {
        let Some(inner) = self.sink.upgrade() else {
            return false;
        };
        let handler = inner.handler.lock();
        handler
            .as_ref()
            .is_some_and(|active| active.generation == self.generation)
    }
}

impl Drop for SinkRegistration {
    fn drop(&mut self) {
        let Some(inner) = self.sink.upgrade() else {
            return;
        };
        let mut handler = inner.handler.lock();
        if handler
            .as_ref()
            .is_some_and(|active| active.generation == self.generation)
        {
            *handler = None;
            debug!("Error handler {} deregistered", self.generation);
        }
    }
}
