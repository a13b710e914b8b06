//! services/client/src/adapters/navigator.rs
//!
//! The `Navigator` adapter. It keeps the current route and its history, logs every
//! navigation and publishes the location on a `watch` channel for observers.

use habit_tracker_core::domain::routes;
use habit_tracker_core::ports::Navigator;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::info;

/// A `Navigator` that records locations instead of driving a browser.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
    location: watch::Sender<String>,
}

impl HistoryNavigator {
    /// Creates a navigator that starts at `start`. The start location is not part
    /// of the recorded history.
    pub fn new(start: &str) -> Self {
        let (location, _) = watch::channel(start.to_string());
        Self {
            history: Mutex::new(Vec::new()),
            location,
        }
    }

    /// Every route navigated to, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// How many times `route` was navigated to.
    pub fn visits(&self, route: &str) -> usize {
        self.history.lock().iter().filter(|r| *r == route).count()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new(routes::LANDING)
    }
}

impl Navigator for HistoryNavigator {
    fn replace(&self, route: &str) {
        info!("Navigating to {}", route);
        self.history.lock().push(route.to_string());
        self.location.send_replace(route.to_string());
    }

    fn current(&self) -> Option<String> {
        Some(self.location.borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_updates_location_and_history() {
        let navigator = HistoryNavigator::default();
        let rx = navigator.subscribe();
        assert_eq!(navigator.current().as_deref(), Some("/"));

        navigator.replace(routes::LOGIN);
        navigator.replace(routes::DASHBOARD);

        assert_eq!(navigator.current().as_deref(), Some(routes::DASHBOARD));
        assert_eq!(*rx.borrow(), routes::DASHBOARD);
        assert_eq!(navigator.history(), vec![routes::LOGIN, routes::DASHBOARD]);
        assert_eq!(navigator.visits(routes::LOGIN), 1);
    }
}
