//! Persistence for per-field lock and open flags
//!
//! The panel never talks to a concrete store. It goes through [`Storage`],
//! which the host constructs and injects. Two implementations ship here:
//!
//! - [`InMemoryStorage`]: flags live for as long as the value does
//! - [`KeyValueStorage`]: flags are written as JSON booleans under
//!   `{prefix}{name}_lock` / `{prefix}{name}_open` in any string store
//!   (browser `localStorage` in the `wasm` feature)

use std::collections::HashMap;
use tracing::warn;

/// Capability for reading and persisting per-field UI flags.
///
/// The defaults describe a store that remembers nothing: every field starts
/// unlocked and open, and updates are discarded.
pub trait Storage {
    fn initial_lock_state(&mut self, _name: &str) -> bool {
        false
    }

    fn on_lock_update(&mut self, _name: &str, _locked: bool) {}

    fn initial_open_state(&mut self, _name: &str) -> bool {
        true
    }

    fn on_open_update(&mut self, _name: &str, _open: bool) {}
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn initial_lock_state(&mut self, name: &str) -> bool {
        (**self).initial_lock_state(name)
    }

    fn on_lock_update(&mut self, name: &str, locked: bool) {
        (**self).on_lock_update(name, locked)
    }

    fn initial_open_state(&mut self, name: &str) -> bool {
        (**self).initial_open_state(name)
    }

    fn on_open_update(&mut self, name: &str, open: bool) {
        (**self).on_open_update(name, open)
    }
}

/// A store that forgets everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl Storage for NoopStorage {}

/// Flags held in memory; unknown names are recorded with their default on
/// first read
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    locks: HashMap<String, bool>,
    opens: HashMap<String, bool>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, name: &str) -> Option<bool> {
        self.locks.get(name).copied()
    }

    pub fn is_open(&self, name: &str) -> Option<bool> {
        self.opens.get(name).copied()
    }
}

impl Storage for InMemoryStorage {
    fn initial_lock_state(&mut self, name: &str) -> bool {
        *self.locks.entry(name.to_string()).or_insert(false)
    }

    fn on_lock_update(&mut self, name: &str, locked: bool) {
        self.locks.insert(name.to_string(), locked);
    }

    fn initial_open_state(&mut self, name: &str) -> bool {
        *self.opens.entry(name.to_string()).or_insert(true)
    }

    fn on_open_update(&mut self, name: &str, open: bool) {
        self.opens.insert(name.to_string(), open);
    }
}

/// A string key-value store such as browser `localStorage`
pub trait KeyValueBackend {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str);
}

impl KeyValueBackend for HashMap<String, String> {
    fn get_item(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.insert(key.to_string(), value.to_string());
    }
}

/// [`Storage`] over a [`KeyValueBackend`], one JSON boolean per flag
#[derive(Debug, Clone)]
pub struct KeyValueStorage<B> {
    backend: B,
    prefix: String,
}

impl<B: KeyValueBackend> KeyValueStorage<B> {
    pub fn new(backend: B) -> Self {
        Self::with_prefix(backend, "params_")
    }

    pub fn with_prefix(backend: B, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn lock_key(&self, name: &str) -> String {
        format!("{}{}_lock", self.prefix, name)
    }

    pub fn open_key(&self, name: &str) -> String {
        format!("{}{}_open", self.prefix, name)
    }

    fn read_flag(&self, key: &str, default: bool) -> bool {
        let Some(stored) = self.backend.get_item(key) else {
            return default;
        };
        match serde_json::from_str::<serde_json::Value>(&stored) {
            Ok(value) => truthy(&value),
            Err(e) => {
                warn!(key, stored = stored.as_str(), error = %e, "ignoring corrupt stored flag");
                default
            }
        }
    }

    fn write_flag(&mut self, key: &str, value: bool) {
        let encoded = if value { "true" } else { "false" };
        self.backend.set_item(key, encoded);
    }
}

impl<B: KeyValueBackend> Storage for KeyValueStorage<B> {
    fn initial_lock_state(&mut self, name: &str) -> bool {
        self.read_flag(&self.lock_key(name), false)
    }

    fn on_lock_update(&mut self, name: &str, locked: bool) {
        let key = self.lock_key(name);
        self.write_flag(&key, locked);
    }

    fn initial_open_state(&mut self, name: &str) -> bool {
        self.read_flag(&self.open_key(name), true)
    }

    fn on_open_update(&mut self, name: &str, open: bool) {
        let key = self.open_key(name);
        self.write_flag(&key, open);
    }
}

/// JavaScript `Boolean()` of a JSON value
fn truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
