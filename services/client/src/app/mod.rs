pub mod api_client;
pub mod error_sink;
pub mod guard;
pub mod notifications;
pub mod session;
pub mod state;
pub mod validation;

pub use api_client::ApiClient;
pub use error_sink::{ErrorRecord, ErrorSink, SinkRegistration};
pub use guard::{AccessGuard, AllowedRoles, GuardDecision, Navigation, RouteTable};
pub use notifications::NotificationBus;
pub use session::{AuthBackend, SessionStore};
pub use state::AppState;
