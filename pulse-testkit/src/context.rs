use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// In-memory keyed store standing in for the external memory handle.
///
/// Handlers under test read and write through this the way production
/// handlers use the real context object. Thread-safe; clones are not
/// shared — wrap in `Arc` as the dispatcher requires.
#[derive(Debug, Default)]
pub struct TestContext {
    entries: Mutex<HashMap<String, Value>>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing any existing entry.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.lock().insert(key.into(), value.into());
    }

    /// Fetch the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
