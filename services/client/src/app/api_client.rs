//! services/client/src/app/api_client.rs
//!
//! The single outbound gateway to the habit tracker REST API.
//!
//! Every backend call goes through `ApiClient`, which attaches the bearer token to
//! protected routes and applies the session-level policy for 401 and 403 responses
//! before handing the error back to the caller.

use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use habit_tracker_core::domain::{routes, Role};
use habit_tracker_core::ports::{DurableStorage, Navigator};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

//=========================================================================================
// Route Classification
//=========================================================================================

/// Path fragments of the endpoints that work without a session. Requests to them
/// never carry the bearer token, even when one is stored.
pub const PUBLIC_ROUTES: [&str; 8] = [
    "auth/login",
    "auth/signup",
    "auth/register",
    "auth/forgot-password",
    "auth/reset-password",
    "auth/verify-email",
    "auth/send-verification-email",
    "feedback",
];

/// Admin-scoped paths are never public, so `admin/feedback` keeps its token while
/// anonymous `feedback` submission does not send one.
pub fn is_public_route(path: &str) -> bool {
    !is_admin_route(path) && PUBLIC_ROUTES.iter().any(|route| path.contains(route))
}

/// True when any path segment is `admin`.
pub fn is_admin_route(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or_default();
    path.split('/').any(|segment| segment == "admin")
}

/// Where a 403 sends the user. Admin endpoints fall back to the user dashboard;
/// anything else goes to the landing route matching the stored role.
pub fn forbidden_redirect(path: &str, stored_role: Option<Role>) -> &'static str {
    if is_admin_route(path) {
        routes::DASHBOARD
    } else if stored_role == Some(Role::Admin) {
        routes::ADMIN
    } else {
        routes::LANDING
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

//=========================================================================================
// The Main Client Struct
//=========================================================================================

/// HTTP client for the habit tracker API.
///
/// Holds no session state of its own. The token and identity are read from
/// durable storage on every request, so independently built clients sharing a
/// storage apply the same policy.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn DurableStorage>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Creates a new `ApiClient` from the loaded configuration.
    pub fn new(
        config: &Config,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            storage,
            navigator,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The token to attach to a request for `path`, if any.
    pub fn outbound_token(&self, path: &str) -> Option<String> {
        if is_public_route(path) {
            None
        } else {
            self.storage.token()
        }
    }

    /// Makes a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.execute(Method::GET, path, None::<&()>).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Method::POST, path, Some(body)).await
    }

    /// Makes a PUT request with a JSON body.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Method::PUT, path, Some(body)).await
    }

    /// Makes a DELETE request.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.execute(Method::DELETE, path, None::<&()>).await
    }

    async fn execute<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let path = normalize_path(path);
        let (request, sent_token) = self.build_request(method.clone(), &path, body);
        debug!("{} {} (authenticated: {})", method, path, sent_token);

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let text = response.text().await?;
            let value = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text)?
            };
            return Ok(serde_json::from_value(value)?);
        }

        let body = read_error_body(response).await;
        Err(self.handle_failure(&path, status, body, sent_token))
    }

    fn build_request<B>(&self, method: Method, path: &str, body: Option<&B>) -> (RequestBuilder, bool)
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, url);

        let token = self.outbound_token(path);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        (request, token.is_some())
    }

    /// Applies the session policy for a failed response and returns the error the
    /// caller receives. The side effects run regardless of what the caller does
    /// with the error. Public routes get none: their 401 and 403 are plain `Api`
    /// errors for the caller to show.
    pub fn handle_failure(
        &self,
        path: &str,
        status: StatusCode,
        body: Option<Value>,
        sent_token: bool,
    ) -> ClientError {
        match status {
            StatusCode::UNAUTHORIZED if !is_public_route(path) => {
                self.expire_session(path, sent_token);
                ClientError::Authorization {
                    status: status.as_u16(),
                }
            }
            StatusCode::FORBIDDEN if !is_public_route(path) => {
                let role = self.storage.identity().map(|identity| identity.role);
                let target = forbidden_redirect(path, role);
                warn!("Forbidden on {} (stored role: {:?}); redirecting to {}", path, role, target);
                self.navigator.replace(target);
                ClientError::Authorization {
                    status: status.as_u16(),
                }
            }
            _ => ClientError::Api {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// Clears the stored session and sends the user to the login route.
    ///
    /// Token removal is atomic, so when several requests fail at once only the one
    /// that removed the token navigates. A request sent without any token always
    /// navigates: the user was never signed in.
    fn expire_session(&self, path: &str, sent_token: bool) {
        match self.storage.clear_session() {
            Ok(cleared) if cleared || !sent_token => {
                warn!("Session rejected on {}; redirecting to login", path);
                self.navigator.replace(routes::LOGIN);
            }
            Ok(_) => debug!("Session on {} was already cleared by a concurrent request", path),
            Err(e) => {
                error!("Session rejected on {} but could not be cleared: {}", path, e);
                self.navigator.replace(routes::LOGIN);
            }
        }
    }
}

/// Reads an error body as JSON, falling back to the raw text.
async fn read_error_body(response: Response) -> Option<Value> {
    let text = response.text().await.ok()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_routes_match_anywhere_in_the_path() {
        assert!(is_public_route("/auth/login"));
        assert!(is_public_route("auth/signup"));
        assert!(is_public_route("/auth/send-verification-email"));
        assert!(is_public_route("/feedback"));
        assert!(!is_public_route("/habits"));
        assert!(!is_public_route("/auth/me"));
        assert!(!is_public_route("/admin/feedback"));
    }

    #[test]
    fn admin_routes_are_detected_with_or_without_leading_slash() {
        assert!(is_admin_route("/admin/users"));
        assert!(is_admin_route("admin/statistics"));
        assert!(!is_admin_route("/habits/administration-free"));
    }

    #[test]
    fn forbidden_redirects_follow_route_then_role() {
        assert_eq!(forbidden_redirect("/admin/users", Some(Role::User)), routes::DASHBOARD);
        assert_eq!(forbidden_redirect("/habits", Some(Role::Admin)), routes::ADMIN);
        assert_eq!(forbidden_redirect("/habits", Some(Role::User)), routes::LANDING);
        assert_eq!(forbidden_redirect("/habits", None), routes::LANDING);
    }

    #[test]
    fn public_route_rejections_have_no_session_side_effects() {
        use crate::adapters::{HistoryNavigator, MemoryStorage};
        use habit_tracker_core::ports::keys;

        let storage = Arc::new(MemoryStorage::new());
        storage.set(keys::TOKEN, "t").unwrap();
        storage.set(keys::USER, r#"{"userId":"1","username":"u","role":"ADMIN"}"#).unwrap();
        let navigator = Arc::new(HistoryNavigator::default());
        let config = Config::for_base_url("http://127.0.0.1:9/api").unwrap();
        let api = ApiClient::new(&config, storage.clone(), navigator.clone()).unwrap();

        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = api.handle_failure("/auth/login", status, None, false);
            assert!(matches!(err, ClientError::Api { status: s, .. } if s == status.as_u16()));
        }
        assert!(navigator.history().is_empty());
        assert_eq!(storage.token().as_deref(), Some("t"));
    }
}
