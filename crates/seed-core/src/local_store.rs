//! Durable client-side key/value storage (the browser's local storage).

use std::collections::HashMap;

use crate::error::ChatResult;

/// Key under which the active session identity is kept.
pub const SID_KEY: &str = "aseed_sid";

/// Key under which the theme preference is kept.
pub const THEME_KEY: &str = "aseed_theme";

pub trait LocalStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> ChatResult<()>;
}

/// Volatile store, for tests and for running without a data directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> ChatResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<T: LocalStore + ?Sized> LocalStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> ChatResult<()> {
        (**self).set(key, value)
    }
}
