//! crates/habit_tracker_core/src/normalize.rs
//!
//! Shape-tolerant parsing of backend payloads into canonical domain types.
//!
//! The habit tracker API is inconsistent about field casing across endpoints and
//! returns the login result either as a nested `user` object or as flat fields.
//! Every lookup here follows a fixed priority order so that all consumers see the
//! same canonical `Identity` and `Role`.

use crate::domain::{Identity, Role};
use serde_json::{Map, Value};

/// Lookup order for the role field. After these, any key equal to `role`
/// ignoring ASCII case is accepted.
pub const ROLE_KEYS: [&str; 3] = ["role", "Role", "ROLE"];

/// Lookup order for the user id field.
pub const USER_ID_KEYS: [&str; 5] = ["userId", "UserId", "user_id", "id", "Id"];

/// Lookup order for the username field.
pub const USERNAME_KEYS: [&str; 4] = ["username", "Username", "userName", "UserName"];

const TOKEN_KEYS: [&str; 2] = ["token", "Token"];

/// Finds the first present key from `keys`, in order.
fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<(&'a str, &'a Value)> {
    keys.iter()
        .find_map(|key| object.get_key_value(*key))
        .map(|(k, v)| (k.as_str(), v))
}

/// Renders a scalar as text. Ids arrive as numbers from some endpoints.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads the raw role text of an identity-shaped object.
pub fn role_field(object: &Map<String, Value>) -> Option<&str> {
    let exact = lookup(object, &ROLE_KEYS).and_then(|(_, v)| v.as_str());
    exact.or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("role"))
            .and_then(|(_, v)| v.as_str())
    })
}

/// Computes the effective role.
///
/// An explicit in-memory role wins. Otherwise the identity payload's role field
/// is read with [`role_field`]. `None` means there is no identity at all.
pub fn resolve_role(explicit: Option<Role>, identity: Option<&Value>) -> Option<Role> {
    if explicit.is_some() {
        return explicit;
    }
    let object = identity?.as_object()?;
    Some(role_field(object).map(Role::parse).unwrap_or(Role::User))
}

/// Builds an `Identity` from an identity-shaped JSON object.
///
/// Returns `None` for anything that is not an object. Missing id or username
/// become empty strings, a missing role becomes `USER`. Fields that are not part
/// of the canonical triple are kept in `profile`.
pub fn normalize_identity(value: &Value) -> Option<Identity> {
    let object = value.as_object()?;

    let id_entry = lookup(object, &USER_ID_KEYS);
    let name_entry = lookup(object, &USERNAME_KEYS);

    let user_id = id_entry.and_then(|(_, v)| scalar_text(v)).unwrap_or_default();
    let username = name_entry.and_then(|(_, v)| scalar_text(v)).unwrap_or_default();
    let role = role_field(object).map(Role::parse).unwrap_or(Role::User);

    let consumed = [id_entry.map(|(k, _)| k), name_entry.map(|(k, _)| k)];
    let profile = object
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("role"))
        .filter(|(k, _)| !consumed.contains(&Some(k.as_str())))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Some(Identity {
        user_id,
        username,
        role,
        profile,
    })
}

/// Builds the `Identity` carried by a login response.
///
/// A nested `user` object takes priority. Otherwise only the flat id, username and
/// role fields of the response are used, so the token never ends up in the profile.
pub fn identity_from_login(response: &Value) -> Option<Identity> {
    let object = response.as_object()?;

    if let Some(user) = object.get("user").filter(|u| u.is_object()) {
        return normalize_identity(user);
    }

    let mut flat = Map::new();
    for keys in [&USER_ID_KEYS[..], &USERNAME_KEYS[..]] {
        if let Some((k, v)) = lookup(object, keys) {
            flat.insert(k.to_string(), v.clone());
        }
    }
    if let Some(role) = role_field(object) {
        flat.insert("role".to_string(), Value::String(role.to_string()));
    }
    normalize_identity(&Value::Object(flat))
}

/// Extracts the bearer token from a login response. Empty tokens count as absent.
pub fn token_from_login(response: &Value) -> Option<String> {
    let object = response.as_object()?;
    lookup(object, &TOKEN_KEYS)
        .and_then(|(_, v)| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Trims a notification message. Returns `None` when nothing is left.
pub fn normalize_message(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
