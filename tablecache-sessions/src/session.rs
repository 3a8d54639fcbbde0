//! Session state for one request

use crate::options::CookieOptions;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// Session payload. Values are dynamically typed JSON (string, number,
/// bool, null, array, nested map).
pub type Values = HashMap<String, Value>;

/// Server-side session referenced by a signed cookie
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Backend key of the session; empty until first saved
    pub id: String,
    pub values: Values,
    pub options: CookieOptions,
    /// True unless the session was loaded from the backend
    pub is_new: bool,
    name: String,
}

impl Session {
    /// Create an empty, new session for the cookie `name`
    pub fn new(name: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            id: String::new(),
            values: Values::new(),
            options,
            is_new: true,
            name: name.into(),
        }
    }

    /// Cookie name of the session
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a value converted to `T`; `None` if absent or of another shape
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Set a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
