//! services/client/src/app/guard.rs
//!
//! Role-based gating of client routes.
//!
//! An `AccessGuard` decides, for one navigation attempt, whether a protected route
//! may render. Nothing is cached: every evaluation reads the session store, so a
//! logout or a login as someone else is reflected on the next navigation.

use crate::app::session::SessionStore;
use habit_tracker_core::domain::{routes, Role};
use tracing::debug;

//=========================================================================================
// Allowed Roles
//=========================================================================================

/// The set of roles a guarded route accepts. Built from role names in any casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedRoles(Vec<String>);

impl AllowedRoles {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            roles
                .into_iter()
                .map(|role| role.as_ref().trim().to_uppercase())
                .filter(|role| !role.is_empty())
                .collect(),
        )
    }

    pub fn permits(&self, role: Role) -> bool {
        self.0.iter().any(|allowed| role.matches(allowed))
    }
}

impl From<Role> for AllowedRoles {
    fn from(role: Role) -> Self {
        Self::new([role.as_str()])
    }
}

impl From<&str> for AllowedRoles {
    fn from(role: &str) -> Self {
        Self::new([role])
    }
}

impl<const N: usize> From<[&str; N]> for AllowedRoles {
    fn from(roles: [&str; N]) -> Self {
        Self::new(roles)
    }
}

impl From<Vec<Role>> for AllowedRoles {
    fn from(roles: Vec<Role>) -> Self {
        Self::new(roles.iter().map(Role::as_str))
    }
}

//=========================================================================================
// AccessGuard
//=========================================================================================

/// Outcome of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session store has not finished its initial read. No decision yet.
    Loading,
    RedirectToLogin,
    /// Signed in with a role the route does not accept.
    Redirect(String),
    Render,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGuard {
    allowed: AllowedRoles,
    fallback: String,
}

impl AccessGuard {
    /// A guard for `allowed` roles that sends everyone else to `fallback`.
    pub fn new(allowed: impl Into<AllowedRoles>, fallback: &str) -> Self {
        Self {
            allowed: allowed.into(),
            fallback: fallback.to_string(),
        }
    }

    /// User-only routes. Admins are sent to the admin console.
    pub fn user_only() -> Self {
        Self::new(Role::User, routes::ADMIN)
    }

    /// Admin-only routes. Users are sent to their dashboard.
    pub fn admin_only() -> Self {
        Self::new(Role::Admin, routes::DASHBOARD)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn evaluate(&self, session: &SessionStore) -> GuardDecision {
        if session.is_loading() {
            return GuardDecision::Loading;
        }
        if !session.is_authenticated() {
            return GuardDecision::RedirectToLogin;
        }
        match session.role() {
            Some(role) if self.allowed.permits(role) => GuardDecision::Render,
            role => {
                debug!("Role {:?} not allowed; redirecting to {}", role, self.fallback);
                GuardDecision::Redirect(self.fallback.clone())
            }
        }
    }
}

//=========================================================================================
// RouteTable
//=========================================================================================

/// What happens when the user navigates to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Loading,
    Render,
    Redirect(String),
}

#[derive(Debug, Clone)]
enum Access {
    Public,
    Guarded(AccessGuard),
}

#[derive(Debug, Clone)]
struct RouteEntry {
    /// Path segments. A segment starting with `:` matches any single segment.
    pattern: Vec<String>,
    access: Access,
}

impl RouteEntry {
    fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = split_path(path).collect();
        segments.len() == self.pattern.len()
            && self
                .pattern
                .iter()
                .zip(&segments)
                .all(|(pattern, segment)| pattern.starts_with(':') || pattern.as_str() == *segment)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|segment| !segment.is_empty())
}

/// The client's route table. Unknown paths redirect to the landing route.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The habit tracker's routes.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for path in [
            routes::LANDING,
            routes::LOGIN,
            "/register",
            "/forgot-password",
            "/reset-password",
            "/verify-email",
        ] {
            table = table.public(path);
        }
        for path in [
            routes::DASHBOARD,
            "/habits",
            "/habits/create",
            "/habits/edit/:id",
            "/habits/:id",
            "/habits/:id/logs",
            "/categories",
            "/analytics",
            "/profile",
            "/reminders",
        ] {
            table = table.guarded(path, AccessGuard::user_only());
        }
        table.guarded(routes::ADMIN, AccessGuard::admin_only())
    }

    pub fn public(mut self, pattern: &str) -> Self {
        self.entries.push(RouteEntry {
            pattern: split_path(pattern).map(str::to_string).collect(),
            access: Access::Public,
        });
        self
    }

    pub fn guarded(mut self, pattern: &str, guard: AccessGuard) -> Self {
        self.entries.push(RouteEntry {
            pattern: split_path(pattern).map(str::to_string).collect(),
            access: Access::Guarded(guard),
        });
        self
    }

    /// The guard protecting `path`, if the path is known and guarded. Entries are
    /// tried in insertion order.
    pub fn guard_for(&self, path: &str) -> Option<&AccessGuard> {
        match &self.entries.iter().find(|entry| entry.matches(path))?.access {
            Access::Public => None,
            Access::Guarded(guard) => Some(guard),
        }
    }

    pub fn navigate(&self, path: &str, session: &SessionStore) -> Navigation {
        let Some(entry) = self.entries.iter().find(|entry| entry.matches(path)) else {
            debug!("Unknown route {}; redirecting to landing", path);
            return Navigation::Redirect(routes::LANDING.to_string());
        };
        match &entry.access {
            Access::Public => Navigation::Render,
            Access::Guarded(guard) => match guard.evaluate(session) {
                GuardDecision::Loading => Navigation::Loading,
                GuardDecision::Render => Navigation::Render,
                GuardDecision::RedirectToLogin => Navigation::Redirect(routes::LOGIN.to_string()),
                GuardDecision::Redirect(target) => Navigation::Redirect(target),
            },
        }
    }
}
