//! services/client/src/adapters/http_auth.rs
//!
//! The authentication backend spoken over HTTP. Every call goes through the shared
//! `ApiClient`, so the `auth/*` routes stay on its public allow-list.

use crate::app::api_client::ApiClient;
use crate::app::session::AuthBackend;
use crate::error::ClientResult;
use async_trait::async_trait;
use habit_tracker_core::domain::{Credentials, PasswordReset, Registration};
use serde_json::{json, Value};
use std::sync::Arc;

/// `AuthBackend` over the REST API's `auth/*` endpoints.
pub struct HttpAuthBackend {
    api: Arc<ApiClient>,
}

impl HttpAuthBackend {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> ClientResult<Value> {
        self.api.post("/auth/login", credentials).await
    }

    async fn register(&self, registration: &Registration) -> ClientResult<Value> {
        self.api.post("/auth/signup", registration).await
    }

    async fn forgot_password(&self, email: &str) -> ClientResult<Value> {
        self.api
            .post("/auth/forgot-password", &json!({ "email": email }))
            .await
    }

    async fn reset_password(&self, reset: &PasswordReset) -> ClientResult<Value> {
        self.api.post("/auth/reset-password", reset).await
    }

    async fn send_verification_email(&self, email: &str) -> ClientResult<Value> {
        self.api
            .post("/auth/send-verification-email", &json!({ "email": email }))
            .await
    }

    async fn verify_email(&self, email: &str, otp: &str) -> ClientResult<Value> {
        self.api
            .post("/auth/verify-email", &json!({ "email": email, "otp": otp }))
            .await
    }
}
