//! crates/habit_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the client.
//! These types are independent of any storage backend or HTTP library.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

//=========================================================================================
// Routes
//=========================================================================================

/// Client routes the core itself navigates to.
pub mod routes {
    /// Public landing page.
    pub const LANDING: &str = "/";
    pub const LOGIN: &str = "/login";
    /// Landing route for `USER` sessions.
    pub const DASHBOARD: &str = "/dashboard";
    /// Landing route for `ADMIN` sessions.
    pub const ADMIN: &str = "/admin";
}

//=========================================================================================
// Identity
//=========================================================================================

/// The access level of a signed-in principal.
///
/// Deserialization is case-insensitive because the backend is not consistent
/// about casing. Anything that is not `ADMIN` resolves to `USER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Parses role text from any source. Trims and uppercases before comparing.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("ADMIN") {
            Role::Admin
        } else {
            Role::User
        }
    }

    /// The canonical, uppercase name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Compares against role text ignoring case and surrounding whitespace.
    pub fn matches(&self, raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case(self.as_str())
    }

    /// The route a session with this role lands on after login.
    pub fn landing_route(&self) -> &'static str {
        match self {
            Role::User => routes::DASHBOARD,
            Role::Admin => routes::ADMIN,
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Role::parse(&raw)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized representation of the signed-in user.
///
/// Built only through [`crate::normalize`]; callers read snapshots of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    /// Any extra profile fields the backend sent along (email, names, ...).
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// Credentials submitted by the login form.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Payload submitted by the registration form. The backend DTO is PascalCase.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Registration {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub mobile_number: String,
    pub password: String,
    pub confirm_password: String,
    /// Date of birth as an RFC 3339 timestamp.
    pub dob: Option<DateTime<Utc>>,
}

/// Payload for completing a password reset with an emailed one-time code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub email: String,
    pub otp: String,
    pub new_password: String,
    pub confirm_password: String,
}

//=========================================================================================
// Notifications
//=========================================================================================

/// Unique identifier of a toast. Random, so two toasts created in the same
/// millisecond still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ToastId(Uuid);

impl ToastId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ToastId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    /// How long a toast of this kind stays up when the producer does not say.
    /// Errors get the most reading time.
    pub fn default_ttl(&self) -> Duration {
        match self {
            ToastKind::Success | ToastKind::Info => Duration::from_millis(5_000),
            ToastKind::Warning => Duration::from_millis(6_000),
            ToastKind::Error => Duration::from_millis(8_000),
        }
    }
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Warning => "warning",
            ToastKind::Info => "info",
        };
        f.write_str(name)
    }
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub id: ToastId,
    /// Never empty, already trimmed.
    pub message: String,
    pub kind: ToastKind,
    /// Zero means the toast stays until dismissed.
    pub ttl: Duration,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn is_sticky(&self) -> bool {
        self.ttl.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_ignores_case() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("Admin"), Role::Admin);
        assert_eq!(Role::parse(" ADMIN "), Role::Admin);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("superuser"), Role::User);
        assert_eq!(Role::parse(""), Role::User);
    }

    #[test]
    fn role_serializes_uppercase_and_deserializes_any_case() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"aDmIn\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn landing_routes_follow_role() {
        assert_eq!(Role::Admin.landing_route(), routes::ADMIN);
        assert_eq!(Role::User.landing_route(), routes::DASHBOARD);
    }

    #[test]
    fn errors_stay_up_longest() {
        assert!(ToastKind::Error.default_ttl() > ToastKind::Warning.default_ttl());
        assert!(ToastKind::Warning.default_ttl() > ToastKind::Info.default_ttl());
        assert_eq!(ToastKind::Success.default_ttl(), ToastKind::Info.default_ttl());
    }
}
