//! services/client/src/app/notifications.rs
//!
//! The notification bus: an ordered queue of toasts with per-toast expiry.
//!
//! Producers call `show` (or one of the severity shortcuts) and forget about the
//! toast. Each toast with a TTL gets its own expiry task; dismissing or expiring
//! one toast never touches the others or reorders the queue.

use crate::app::error_sink::{ErrorSink, SinkRegistration};
use chrono::Utc;
use habit_tracker_core::domain::{Toast, ToastId, ToastKind};
use habit_tracker_core::normalize::normalize_message;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct BusInner {
    toasts: watch::Sender<Vec<Toast>>,
    /// Cancels every pending expiry task when the bus goes away.
    shutdown: CancellationToken,
}

impl Drop for BusInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Cheap to clone; clones share one queue.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        let (toasts, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(BusInner {
                toasts,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Enqueues a toast and returns its id.
    ///
    /// Blank messages are rejected with a warning and return `None`. A zero `ttl`
    /// keeps the toast until it is dismissed. Otherwise it is removed `ttl` after
    /// this call. Expiry needs a Tokio runtime; without one the toast stays.
    pub fn show(&self, message: &str, kind: ToastKind, ttl: Duration) -> Option<ToastId> {
        let Some(message) = normalize_message(message) else {
            warn!("Ignoring {} notification with an empty message", kind);
            return None;
        };

        let toast = Toast {
            id: ToastId::new(),
            message,
            kind,
            ttl,
            created_at: Utc::now(),
        };
        let id = toast.id;
        debug!("Showing {} toast {}: {}", kind, id, toast.message);
        self.inner.toasts.send_modify(|toasts| toasts.push(toast));

        if !ttl.is_zero() {
            self.schedule_expiry(id, Instant::now() + ttl);
        }
        Some(id)
    }

    pub fn success(&self, message: &str) -> Option<ToastId> {
        self.show(message, ToastKind::Success, ToastKind::Success.default_ttl())
    }

    pub fn info(&self, message: &str) -> Option<ToastId> {
        self.show(message, ToastKind::Info, ToastKind::Info.default_ttl())
    }

    pub fn warning(&self, message: &str) -> Option<ToastId> {
        self.show(message, ToastKind::Warning, ToastKind::Warning.default_ttl())
    }

    pub fn error(&self, message: &str) -> Option<ToastId> {
        self.show(message, ToastKind::Error, ToastKind::Error.default_ttl())
    }

    /// Removes the toast if it is still queued. Returns whether anything was
    /// removed; unknown or already expired ids are a no-op.
    pub fn dismiss(&self, id: ToastId) -> bool {
        dismiss_in(&self.inner, id)
    }

    /// Snapshot of the queue, oldest first.
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.toasts.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.inner.toasts.subscribe()
    }

    /// Makes this bus the error sink's handler. Reports become error toasts until
    /// the registration is dropped or another bus attaches.
    pub fn attach(&self, sink: &ErrorSink) -> SinkRegistration {
        let bus = Arc::downgrade(&self.inner);
        sink.register(move |message| {
            if let Some(inner) = bus.upgrade() {
                NotificationBus { inner }.error(message);
            }
        })
    }

    fn schedule_expiry(&self, id: ToastId, deadline: Instant) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime; toast {} will not expire on its own", id);
            return;
        };
        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        runtime.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = sleep_until(deadline) => {
                    if let Some(inner) = bus.upgrade() {
                        if dismiss_in(&inner, id) {
                            debug!("Toast {} expired", id);
                        }
                    }
                }
            }
        });
    }
}

fn dismiss_in(inner: &BusInner, id: ToastId) -> bool {
    inner.toasts.send_if_modified(|toasts| {
        let before = toasts.len();
        toasts.retain(|toast| toast.id != id);
        toasts.len() != before
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, TIMEOUT_MESSAGE};
    use std::collections::HashSet;

    fn messages(bus: &NotificationBus) -> Vec<String> {
        bus.toasts().into_iter().map(|t| t.message).collect()
    }

    #[tokio::test]
    async fn ids_are_unique_in_a_burst() {
        let bus = NotificationBus::new();
        let ids: HashSet<ToastId> = (0..500)
            .filter_map(|i| bus.info(&format!("toast {}", i)))
            .collect();
        assert_eq!(ids.len(), 500);
        assert_eq!(bus.toasts().len(), 500);
    }

    #[tokio::test]
    async fn blank_messages_are_rejected_and_text_is_trimmed() {
        let bus = NotificationBus::new();
        assert!(bus.success("").is_none());
        assert!(bus.success(" \n\t ").is_none());
        assert!(bus.toasts().is_empty());

        bus.success("  ok  ").unwrap();
        assert_eq!(messages(&bus), vec!["ok"]);
    }

    #[tokio::test]
    async fn shortcuts_use_their_default_ttls() {
        let bus = NotificationBus::new();
        bus.error("bad");
        bus.info("fyi");
        let toasts = bus.toasts();
        assert_eq!(toasts[0].kind, ToastKind::Error);
        assert_eq!(toasts[0].ttl, Duration::from_secs(8));
        assert_eq!(toasts[1].ttl, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn dismissal_is_idempotent() {
        let bus = NotificationBus::new();
        let id = bus.show("short", ToastKind::Info, Duration::from_millis(50)).unwrap();
        let keep = bus.show("long", ToastKind::Info, Duration::ZERO).unwrap();

        assert!(bus.dismiss(id));
        assert!(!bus.dismiss(id));

        let expiring = bus.show("expiring", ToastKind::Info, Duration::from_millis(50)).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!bus.dismiss(expiring));

        assert_eq!(bus.toasts().len(), 1);
        assert_eq!(bus.toasts()[0].id, keep);
    }

    #[tokio::test(start_paused = true)]
    async fn toasts_expire_after_their_ttl() {
        let bus = NotificationBus::new();
        bus.show("brief", ToastKind::Info, Duration::from_millis(100)).unwrap();
        assert_eq!(messages(&bus), vec!["brief"]);

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(bus.toasts().len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(bus.toasts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn removal_keeps_order_and_other_timers() {
        let bus = NotificationBus::new();
        let a = bus.show("a", ToastKind::Info, Duration::from_millis(300)).unwrap();
        bus.show("b", ToastKind::Info, Duration::from_millis(100)).unwrap();
        bus.show("c", ToastKind::Info, Duration::ZERO).unwrap();
        bus.show("d", ToastKind::Info, Duration::from_millis(500)).unwrap();

        bus.dismiss(a);
        assert_eq!(messages(&bus), vec!["b", "c", "d"]);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(messages(&bus), vec!["c", "d"]);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(messages(&bus), vec!["c"]);
    }

    #[tokio::test]
    async fn subscribers_see_queue_changes() {
        let bus = NotificationBus::new();
        let mut rx = bus.subscribe();
        let id = bus.warning("careful").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        bus.dismiss(id);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn only_the_latest_attached_bus_receives_reports() {
        let sink = ErrorSink::new();
        let first = NotificationBus::new();
        let second = NotificationBus::new();

        let first_registration = first.attach(&sink);
        let _second_registration = second.attach(&sink);

        sink.report(&ClientError::Timeout);
        assert!(first.toasts().is_empty());
        assert_eq!(messages(&second), vec![TIMEOUT_MESSAGE]);
        assert_eq!(second.toasts()[0].kind, ToastKind::Error);

        drop(first_registration);
        sink.report_message("again");
        assert_eq!(second.toasts().len(), 2);
    }

    #[tokio::test]
    async fn dropped_bus_stops_receiving_reports() {
        let sink = ErrorSink::new();
        let bus = NotificationBus::new();
        let registration = bus.attach(&sink);
        drop(bus);

        sink.report_message("nobody listening");
        assert!(registration.is_active());
        assert_eq!(sink.recent_errors().len(), 1);
    }
}
