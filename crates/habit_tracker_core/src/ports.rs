//! crates/habit_tracker_core/src/ports.rs
//!
//! Defines the contracts (traits) between the client core and its environment.
//! Durable storage and navigation are the two platform primitives the session
//! logic needs; adapters for them live in the `client` service crate.

use crate::domain::Identity;
use crate::normalize::normalize_identity;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Durable Storage
//=========================================================================================

/// Well-known durable storage slots.
pub mod keys {
    /// The raw bearer token.
    pub const TOKEN: &str = "token";
    /// The serialized `Identity`.
    pub const USER: &str = "user";
    /// Username remembered for the login form. Survives logout.
    pub const REMEMBERED_USERNAME: &str = "rememberedUsername";
}

/// String key/value storage that survives restarts.
///
/// Absence is a valid state for every key at any time: the storage may be cleared
/// from outside the process.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removes a key and returns the value it held. Check-and-remove is atomic,
    /// so of several concurrent callers at most one sees `Some`. An error means
    /// the key may still be stored.
    fn remove(&self, key: &str) -> PortResult<Option<String>>;

    /// The stored bearer token, if any. Blank tokens count as absent.
    fn token(&self) -> Option<String> {
        self.get(keys::TOKEN).filter(|t| !t.trim().is_empty())
    }

    /// The stored identity, normalized. Unparseable contents count as absent.
    fn identity(&self) -> Option<Identity> {
        let raw = self.get(keys::USER)?;
        let value = serde_json::from_str(&raw).ok()?;
        normalize_identity(&value)
    }

    /// Removes the token and the identity. Returns whether a token was removed.
    fn clear_session(&self) -> PortResult<bool> {
        let had_token = self.remove(keys::TOKEN)?.is_some();
        self.remove(keys::USER)?;
        Ok(had_token)
    }
}

//=========================================================================================
// Navigation
//=========================================================================================

/// Moves the user to another client route.
pub trait Navigator: Send + Sync {
    /// Replaces the current location with `route`. Navigating to the route that is
    /// already current is harmless.
    fn replace(&self, route: &str);

    /// The current location, if known.
    fn current(&self) -> Option<String>;
}
