//! services/client/src/app/session.rs
//!
//! The session store: the single source of truth for who is signed in and with
//! what role.
//!
//! Durable storage is authoritative. The in-memory identity is a cache that may
//! lag behind it (for example in a store built before another one logged in), so
//! every read falls back to storage when memory is empty. Once the token is gone
//! from storage, whoever removed it, the cached identity is dropped as well.

use crate::error::{body_message, ClientError, ClientResult};
use async_trait::async_trait;
use habit_tracker_core::domain::{routes, Credentials, Identity, PasswordReset, Registration, Role};
use habit_tracker_core::normalize::{identity_from_login, resolve_role, token_from_login};
use habit_tracker_core::ports::{keys, DurableStorage, Navigator};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

//=========================================================================================
// Backend Port
//=========================================================================================

/// The authentication endpoints the session store delegates to. Every method
/// returns the raw response body.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> ClientResult<Value>;

    async fn register(&self, registration: &Registration) -> ClientResult<Value>;

    async fn forgot_password(&self, email: &str) -> ClientResult<Value>;

    async fn reset_password(&self, reset: &PasswordReset) -> ClientResult<Value>;

    async fn send_verification_email(&self, email: &str) -> ClientResult<Value>;

    async fn verify_email(&self, email: &str, otp: &str) -> ClientResult<Value>;
}

//=========================================================================================
// SessionStore
//=========================================================================================

pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    storage: Arc<dyn DurableStorage>,
    navigator: Arc<dyn Navigator>,
    /// True until `initialize` has run once. Never goes back to true.
    loading: AtomicBool,
    identity: watch::Sender<Option<Identity>>,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            backend,
            storage,
            navigator,
            loading: AtomicBool::new(true),
            identity,
        }
    }

    /// Rehydrates the identity persisted by a previous run. Only the first call
    /// has any effect.
    pub fn initialize(&self) {
        if !self.loading.load(Ordering::Acquire) {
            return;
        }
        let persisted = self.storage.identity();
        match &persisted {
            Some(identity) => info!("Restored session for '{}' ({})", identity.username, identity.role),
            None => info!("No persisted session found"),
        }
        self.identity.send_replace(persisted);
        self.loading.store(false, Ordering::Release);
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Authenticates against the backend and persists the resulting session.
    ///
    /// The token and normalized identity are stored only when the response carries
    /// a token. The raw response is returned either way. A rejection is returned
    /// as `ClientError::Authentication` for the caller to display.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<Value> {
        let response = self
            .backend
            .login(credentials)
            .await
            .map_err(into_authentication_error)?;

        let Some(token) = token_from_login(&response) else {
            warn!("Login response for '{}' carried no token", credentials.username);
            return Ok(response);
        };

        let identity = identity_from_login(&response);
        self.storage.set(keys::TOKEN, &token)?;
        match &identity {
            Some(identity) => self.storage.set(keys::USER, &serde_json::to_string(identity)?)?,
            None => {
                self.storage.remove(keys::USER)?;
            }
        }

        info!(
            "Logged in as '{}' ({})",
            credentials.username,
            identity.as_ref().map(|i| i.role).unwrap_or(Role::User)
        );
        self.identity.send_replace(identity);
        Ok(response)
    }

    /// Creates an account. Does not sign the user in: the email must be verified
    /// first.
    pub async fn register(&self, registration: &Registration) -> ClientResult<Value> {
        let response = self.backend.register(registration).await?;
        info!("Registered account '{}'", registration.username);
        Ok(response)
    }

    /// Clears the session and sends the user to the login route. Cannot fail.
    /// The remembered username is left alone.
    ///
    /// When storage refuses the removal the token stays persisted; the failure is
    /// logged and `is_authenticated` keeps reporting the truth.
    pub fn logout(&self) {
        match self.storage.clear_session() {
            Ok(_) => info!("Logged out"),
            Err(e) => error!("Logout could not clear the stored session: {}", e),
        }
        self.identity.send_replace(None);
        self.navigator.replace(routes::LOGIN);
    }

    /// The signed-in identity, from memory or, when memory has not caught up yet,
    /// from durable storage. `None` whenever no token is stored.
    pub fn current_identity(&self) -> Option<Identity> {
        if !self.is_authenticated() {
            self.forget_identity();
            return None;
        }
        self.identity
            .borrow()
            .clone()
            .or_else(|| self.storage.identity())
    }

    /// The effective role. `None` when there is no identity at all.
    pub fn role(&self) -> Option<Role> {
        if let Some(identity) = self.current_identity() {
            return Some(identity.role);
        }
        if !self.is_authenticated() {
            return None;
        }
        let stored = self
            .storage
            .get(keys::USER)
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok());
        resolve_role(None, stored.as_ref())
    }

    /// Drops the cached identity after the session ended elsewhere (a 401, or
    /// storage cleared from outside). Observers are notified once.
    fn forget_identity(&self) {
        let dropped = self.identity.send_if_modified(|identity| identity.take().is_some());
        if dropped {
            info!("Session ended; cached identity dropped");
        }
    }

    /// True if and only if a token is in durable storage.
    pub fn is_authenticated(&self) -> bool {
        self.storage.token().is_some()
    }

    /// Where a freshly signed-in user should land.
    pub fn landing_route(&self) -> &'static str {
        self.role().unwrap_or(Role::User).landing_route()
    }

    /// Observes in-memory identity changes (login, logout, initialization).
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    /// Remembers `username` for the next login form, or forgets it with `None`.
    pub fn remember_username(&self, username: Option<&str>) -> ClientResult<()> {
        match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(username) => self.storage.set(keys::REMEMBERED_USERNAME, username)?,
            None => {
                self.storage.remove(keys::REMEMBERED_USERNAME)?;
            }
        }
        Ok(())
    }

    pub fn remembered_username(&self) -> Option<String> {
        self.storage.get(keys::REMEMBERED_USERNAME)
    }

    // --- Pass-through account recovery and verification ---

    pub async fn forgot_password(&self, email: &str) -> ClientResult<Value> {
        self.backend.forgot_password(email).await
    }

    pub async fn reset_password(&self, reset: &PasswordReset) -> ClientResult<Value> {
        self.backend.reset_password(reset).await
    }

    pub async fn send_verification_email(&self, email: &str) -> ClientResult<Value> {
        self.backend.send_verification_email(email).await
    }

    pub async fn verify_email(&self, email: &str, otp: &str) -> ClientResult<Value> {
        self.backend.verify_email(email, otp).await
    }
}

/// Client-side rejections of the login call are credential failures.
fn into_authentication_error(error: ClientError) -> ClientError {
    match error {
        ClientError::Api { status, body } if (400..500).contains(&status) => {
            ClientError::Authentication(body_message(status, body.as_ref()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{HistoryNavigator, MemoryStorage};
    use serde_json::json;

    /// An `AuthBackend` that answers every login with the same canned result.
    struct FakeBackend {
        login: fn() -> ClientResult<Value>,
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn login(&self, _credentials: &Credentials) -> ClientResult<Value> {
            (self.login)()
        }
        async fn register(&self, _registration: &Registration) -> ClientResult<Value> {
            Ok(json!({ "message": "Registration successful" }))
        }
        async fn forgot_password(&self, _email: &str) -> ClientResult<Value> {
            Ok(Value::Null)
        }
        async fn reset_password(&self, _reset: &PasswordReset) -> ClientResult<Value> {
            Ok(Value::Null)
        }
        async fn send_verification_email(&self, _email: &str) -> ClientResult<Value> {
            Ok(Value::Null)
        }
        async fn verify_email(&self, _email: &str, _otp: &str) -> ClientResult<Value> {
            Ok(Value::Null)
        }
    }

    fn admin_login() -> ClientResult<Value> {
        Ok(json!({
            "token": "t-admin",
            "userId": 7,
            "username": "root",
            "Role": "admin"
        }))
    }

    fn rejected_login() -> ClientResult<Value> {
        Err(ClientError::Api {
            status: 401,
            body: Some(json!({ "message": "Invalid username or password" })),
        })
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "root".to_string(),
            password: "secret".to_string(),
        }
    }

    struct Harness {
        storage: Arc<MemoryStorage>,
        navigator: Arc<HistoryNavigator>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                storage: Arc::new(MemoryStorage::new()),
                navigator: Arc::new(HistoryNavigator::default()),
            }
        }

        fn store(&self, login: fn() -> ClientResult<Value>) -> SessionStore {
            SessionStore::new(
                Arc::new(FakeBackend { login }),
                self.storage.clone(),
                self.navigator.clone(),
            )
        }
    }

    #[test]
    fn loading_flips_once() {
        let harness = Harness::new();
        let store = harness.store(admin_login);
        assert!(store.is_loading());

        store.initialize();
        assert!(!store.is_loading());
        store.initialize();
        assert!(!store.is_loading());
    }

    #[test]
    fn initialize_restores_persisted_identity() {
        let harness = Harness::new();
        harness.storage.set(keys::TOKEN, "t").unwrap();
        harness
            .storage
            .set(keys::USER, r#"{"userId":"1","username":"ana","role":"admin"}"#)
            .unwrap();

        let store = harness.store(admin_login);
        store.initialize();

        assert!(store.is_authenticated());
        assert_eq!(store.current_identity().unwrap().username, "ana");
        assert_eq!(store.role(), Some(Role::Admin));
    }

    #[tokio::test]
    async fn role_is_visible_in_the_same_tick_as_login() {
        let harness = Harness::new();
        let store = harness.store(admin_login);
        // A second consumer whose in-memory state never saw the login.
        let lagging = harness.store(admin_login);
        store.initialize();
        lagging.initialize();

        store.login(&credentials()).await.unwrap();

        assert_eq!(store.role(), Some(Role::Admin));
        assert_eq!(lagging.role(), Some(Role::Admin));
        assert_eq!(lagging.current_identity().unwrap().user_id, "7");
        assert!(lagging.is_authenticated());
        assert_eq!(lagging.landing_route(), routes::ADMIN);
    }

    #[tokio::test]
    async fn rejected_login_is_an_authentication_error_without_side_effects() {
        let harness = Harness::new();
        let store = harness.store(rejected_login);
        store.initialize();

        let err = store.login(&credentials()).await.unwrap_err();

        assert!(
            matches!(&err, ClientError::Authentication(msg) if msg == "Invalid username or password"),
            "{err:?}"
        );
        assert!(!store.is_authenticated());
        assert!(harness.navigator.history().is_empty());
    }

    #[tokio::test]
    async fn register_does_not_sign_in() {
        let harness = Harness::new();
        let store = harness.store(admin_login);
        store.initialize();

        store.register(&Registration::default()).await.unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.current_identity(), None);
    }

    #[tokio::test]
    async fn logout_clears_session_but_keeps_remembered_username() {
        let harness = Harness::new();
        let store = harness.store(admin_login);
        store.initialize();
        let mut changes = store.subscribe();

        store.login(&credentials()).await.unwrap();
        store.remember_username(Some("root")).unwrap();
        assert!(changes.has_changed().unwrap());
        changes.borrow_and_update();

        store.logout();

        assert!(!store.is_authenticated());
        assert_eq!(store.current_identity(), None);
        assert_eq!(store.role(), None);
        assert!(changes.has_changed().unwrap());
        assert_eq!(store.remembered_username().as_deref(), Some("root"));
        assert_eq!(harness.navigator.current().as_deref(), Some(routes::LOGIN));
    }

    #[tokio::test]
    async fn token_absence_wins_over_cached_identity() {
        let harness = Harness::new();
        let store = harness.store(admin_login);
        store.initialize();
        store.login(&credentials()).await.unwrap();

        let mut changes = store.subscribe();
        changes.borrow_and_update();

        harness.storage.remove(keys::TOKEN).unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.current_identity(), None);
        assert_eq!(store.role(), None);
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), None);
    }

    #[tokio::test]
    async fn logout_reports_truthfully_when_storage_refuses() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage = Arc::new(crate::adapters::FileStorage::new(dir.path().join("storage.json")));
        let navigator = Arc::new(HistoryNavigator::default());
        let store = SessionStore::new(
            Arc::new(FakeBackend { login: admin_login }),
            storage.clone(),
            navigator.clone(),
        );
        store.initialize();
        store.login(&credentials()).await.unwrap();
        std::fs::create_dir(dir.path().join("storage.tmp")).unwrap();

        store.logout();

        assert!(store.is_authenticated());
        assert_eq!(storage.token().as_deref(), Some("t-admin"));
        assert_eq!(navigator.current().as_deref(), Some(routes::LOGIN));
    }

    #[test]
    fn forgetting_the_username_removes_it() {
        let harness = Harness::new();
        let store = harness.store(admin_login);
        store.remember_username(Some("  ana ")).unwrap();
        assert_eq!(store.remembered_username().as_deref(), Some("ana"));

        store.remember_username(None).unwrap();
        assert_eq!(store.remembered_username(), None);
    }
}
