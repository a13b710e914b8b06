//! services/client/src/features/admin.rs
//!
//! The admin console's feedback list and the public form that feeds it.
//!
//! Feedback loading distinguishes "nothing submitted yet" from "could not load":
//! a failed request is never papered over with placeholder rows.

use crate::app::api_client::ApiClient;
use crate::app::validation::validate_email;
use crate::error::{error_message, ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

//=========================================================================================
// Load State
//=========================================================================================

/// Where a list view stands. `Empty` and `Failed` are deliberately separate.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Empty,
    Loaded(Vec<T>),
    /// The request failed; holds the message to show.
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn from_result(result: ClientResult<Vec<T>>) -> Self {
        match result {
            Ok(items) if items.is_empty() => LoadState::Empty,
            Ok(items) => LoadState::Loaded(items),
            Err(e) => LoadState::Failed(error_message(Some(&e))),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            LoadState::Loaded(items) => items,
            _ => &[],
        }
    }
}

//=========================================================================================
// Feedback
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    #[serde(alias = "id", alias = "FeedbackId")]
    pub feedback_id: u64,
    pub name: String,
    pub email: String,
    pub rating: u8,
    pub message: String,
    /// As sent by the backend; not always timezone-qualified.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// The anonymous feedback form.
#[derive(Debug, Clone, Serialize)]
pub struct NewFeedback {
    pub name: String,
    pub email: String,
    pub rating: u8,
    pub message: String,
}

impl NewFeedback {
    /// Trims the text fields and checks them. Failures are joined with ", ".
    pub fn validated(self) -> ClientResult<Self> {
        let feedback = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            rating: self.rating,
            message: self.message.trim().to_string(),
        };

        let mut errors = Vec::new();
        if feedback.name.is_empty() {
            errors.push("Name is required".to_string());
        }
        if let Err(e) = validate_email(&feedback.email) {
            errors.push(e);
        }
        if !(1..=5).contains(&feedback.rating) {
            errors.push("Please select a rating (1-5)".to_string());
        }
        if feedback.message.is_empty() {
            errors.push("Message is required".to_string());
        }

        if errors.is_empty() {
            Ok(feedback)
        } else {
            Err(ClientError::Validation(errors.join(", ")))
        }
    }
}

/// Accepts either a bare array or an object wrapping it under `feedback`.
fn parse_feedback(body: Value) -> ClientResult<Vec<FeedbackItem>> {
    let list = match body {
        Value::Array(_) => body,
        Value::Object(mut object) => object.remove("feedback").unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => {
            return Err(ClientError::Internal(format!(
                "Unexpected feedback payload: {}",
                other
            )))
        }
    };
    Ok(serde_json::from_value(list)?)
}

//=========================================================================================
// AdminService
//=========================================================================================

pub struct AdminService {
    api: Arc<ApiClient>,
}

impl AdminService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn load_feedback(&self) -> LoadState<FeedbackItem> {
        let result = match self.api.get::<Value>("/admin/feedback").await {
            Ok(body) => parse_feedback(body),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!("Could not load feedback: {}", e);
        }
        LoadState::from_result(result)
    }

    /// Submits the public feedback form. Needs no session.
    pub async fn submit_feedback(&self, feedback: NewFeedback) -> ClientResult<Value> {
        let feedback = feedback.validated()?;
        let response = self.api.post("/feedback", &feedback).await?;
        info!("Feedback submitted with rating {}", feedback.rating);
        Ok(response)
    }
}
