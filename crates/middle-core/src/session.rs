//! Session abstraction.
//!
//! Sessions are shared through the request attributes, so every operation
//! takes `&self` and implementations use interior mutability.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

/// Key under which the remaining hop count of each flash entry is stored.
pub const FLASH_KEYS_KEY: &str = "_flash_data_keys";

/// Prefix of the storage keys that hold flash values.
pub const FLASH_DATA_PREFIX: &str = "_flash_data.";

/// Key-value data persisted across requests.
pub trait Session: Send + Sync + fmt::Debug {
    /// Returns true when `key` holds a value.
    fn has(&self, key: &str) -> bool;

    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores a value.
    fn set(&self, key: &str, value: Value);

    /// Returns true when a flash value is stored under `key`.
    fn has_flash(&self, key: &str) -> bool;

    /// Returns the flash value stored under `key`.
    fn get_flash(&self, key: &str) -> Option<Value>;

    /// Stores a value that stays readable during the next request only.
    fn set_flash(&self, key: &str, value: Value);

    /// Removes all data.
    fn destroy(&self);

    /// Requests a new session identifier while keeping the data.
    fn rotate_id(&self);

    /// Returns true when [`Session::rotate_id`] was called.
    fn rotate_requested(&self) -> bool;

    /// Returns true when no data is stored.
    fn is_empty(&self) -> bool;

    /// Returns true when the data was modified since the session was loaded.
    fn has_changed(&self) -> bool;

    /// Returns a snapshot of the stored data, flash bookkeeping included.
    fn to_map(&self) -> IndexMap<String, Value>;
}

/// A session shared through request attributes.
pub type SharedSession = Arc<dyn Session>;

#[derive(Debug, Default)]
struct SessionState {
    data: IndexMap<String, Value>,
    changed: bool,
    rotate: bool,
}

/// In-memory [`Session`] implementation.
///
/// Loading a session ages its flash values: entries flashed during the
/// previous request stay readable for this request and are dropped on the
/// following load.
///
/// # Example
///
/// ```
/// use middle_core::{MemorySession, Session};
/// use serde_json::json;
///
/// let first = MemorySession::default();
/// first.set_flash("notice", json!("saved"));
///
/// let second = MemorySession::new(first.to_map());
/// assert_eq!(second.get_flash("notice"), Some(json!("saved")));
///
/// let third = MemorySession::new(second.to_map());
/// assert!(!third.has_flash("notice"));
/// ```
#[derive(Debug, Default)]
pub struct MemorySession {
    state: Mutex<SessionState>,
}

impl MemorySession {
    /// Loads a session from previously stored data.
    #[must_use]
    pub fn new(data: IndexMap<String, Value>) -> Self {
        let mut state = SessionState {
            data,
            changed: false,
            rotate: false,
        };
        age_flash_data(&mut state);
        Self {
            state: Mutex::new(state),
        }
    }
}

fn age_flash_data(state: &mut SessionState) {
    let Some(Value::Object(hops)) = state.data.get(FLASH_KEYS_KEY).cloned() else {
        return;
    };

    let mut remaining = serde_json::Map::new();
    for (key, count) in hops {
        let count = count.as_i64().unwrap_or(0);
        if count <= 0 {
            state.data.shift_remove(&format!("{FLASH_DATA_PREFIX}{key}"));
        } else {
            remaining.insert(key, Value::from(count - 1));
        }
    }

    if remaining.is_empty() {
        state.data.shift_remove(FLASH_KEYS_KEY);
    } else {
        state
            .data
            .insert(FLASH_KEYS_KEY.to_string(), Value::Object(remaining));
    }
    state.changed = true;
}

impl Session for MemorySession {
    fn has(&self, key: &str) -> bool {
        self.state.lock().data.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.state.lock().data.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut state = self.state.lock();
        state.data.insert(key.to_string(), value);
        state.changed = true;
    }

    fn has_flash(&self, key: &str) -> bool {
        self.has(&format!("{FLASH_DATA_PREFIX}{key}"))
    }

    fn get_flash(&self, key: &str) -> Option<Value> {
        self.get(&format!("{FLASH_DATA_PREFIX}{key}"))
    }

    fn set_flash(&self, key: &str, value: Value) {
        let mut state = self.state.lock();
        state
            .data
            .insert(format!("{FLASH_DATA_PREFIX}{key}"), value);

        let hops = state
            .data
            .entry(FLASH_KEYS_KEY.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !hops.is_object() {
            *hops = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(hops) = hops {
            hops.insert(key.to_string(), Value::from(1));
        }
        state.changed = true;
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        state.data.clear();
        state.changed = true;
    }

    fn rotate_id(&self) {
        self.state.lock().rotate = true;
    }

    fn rotate_requested(&self) -> bool {
        self.state.lock().rotate
    }

    fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    fn has_changed(&self) -> bool {
        self.state.lock().changed
    }

    fn to_map(&self) -> IndexMap<String, Value> {
        self.state.lock().data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let session = MemorySession::default();
        assert!(session.is_empty());
        assert!(!session.has_changed());

        session.set("user", json!(42));
        assert!(session.has("user"));
        assert_eq!(session.get("user"), Some(json!(42)));
        assert!(session.has_changed());
        assert!(!session.is_empty());
    }

    #[test]
    fn test_loaded_session_is_unchanged() {
        let mut data = IndexMap::new();
        data.insert("user".to_string(), json!("alice"));
        let session = MemorySession::new(data);
        assert!(!session.has_changed());
        assert_eq!(session.get("user"), Some(json!("alice")));
    }

    #[test]
    fn test_flash_lifecycle() {
        let first = MemorySession::default();
        first.set_flash("notice", json!("saved"));
        assert!(first.has_flash("notice"));

        let second = MemorySession::new(first.to_map());
        assert_eq!(second.get_flash("notice"), Some(json!("saved")));
        assert!(second.has_changed());

        let third = MemorySession::new(second.to_map());
        assert!(!third.has_flash("notice"));
        assert!(!third.has(FLASH_KEYS_KEY));
    }

    #[test]
    fn test_destroy_and_rotate() {
        let session = MemorySession::default();
        session.set("a", json!(1));
        session.rotate_id();
        assert!(session.rotate_requested());

        session.destroy();
        assert!(session.is_empty());
        assert!(session.has_changed());
    }
}
