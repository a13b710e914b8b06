//! services/client/src/app/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::HttpAuthBackend;
use crate::app::api_client::ApiClient;
use crate::app::error_sink::{ErrorSink, SinkRegistration};
use crate::app::notifications::NotificationBus;
use crate::app::session::{AuthBackend, SessionStore};
use crate::config::Config;
use crate::error::ClientResult;
use habit_tracker_core::ports::{DurableStorage, Navigator};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across the Whole Client)
//=========================================================================================

/// The shared application state, created once at startup and handed to every
/// consumer. Session and notification state live here and nowhere else.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn DurableStorage>,
    pub navigator: Arc<dyn Navigator>,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionStore>,
    pub notifications: NotificationBus,
    pub error_sink: ErrorSink,
    /// Keeps `notifications` installed as the error sink's handler.
    _error_handler: Arc<SinkRegistration>,
}

impl AppState {
    /// Wires the client against the REST API and restores any persisted session.
    pub fn new(
        config: Config,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> ClientResult<Self> {
        let api = Arc::new(ApiClient::new(&config, storage.clone(), navigator.clone())?);
        let backend = Arc::new(HttpAuthBackend::new(api.clone()));
        Ok(Self::with_backend(config, storage, navigator, api, backend))
    }

    /// Like `new`, with a caller-supplied authentication backend.
    pub fn with_backend(
        config: Config,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
        api: Arc<ApiClient>,
        backend: Arc<dyn AuthBackend>,
    ) -> Self {
        let session = Arc::new(SessionStore::new(backend, storage.clone(), navigator.clone()));
        session.initialize();

        let notifications = NotificationBus::new();
        let error_sink = ErrorSink::new();
        let registration = notifications.attach(&error_sink);

        Self {
            config: Arc::new(config),
            storage,
            navigator,
            api,
            session,
            notifications,
            error_sink,
            _error_handler: Arc::new(registration),
        }
    }
}
