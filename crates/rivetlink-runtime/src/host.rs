//! Host key/value API
//!
//! The host exposes named values through `get` and `update`. The adapter
//! calls them one at a time and never batches.

use dashmap::DashMap;
use serde_json::Value;

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host unavailable: {0}")]
    Unavailable(String),

    #[error("host rejected '{key}': {message}")]
    Rejected { key: String, message: String },
}

impl HostError {
    pub fn rejected(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
pub trait HostApi: Send + Sync {
    /// Current value of `key`; `None` when the host has nothing for it.
    async fn get(&self, key: &str) -> HostResult<Option<Value>>;

    async fn update(&self, key: &str, value: Value) -> HostResult<()>;
}

/// In-process host backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryHost {
    values: DashMap<String, Value>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<K, I>(values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let host = Self::new();
        for (k, v) in values {
            host.values.insert(k.into(), v);
        }
        host
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.clone())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait::async_trait]
impl HostApi for MemoryHost {
    async fn get(&self, key: &str) -> HostResult<Option<Value>> {
        Ok(self.value(key))
    }

    async fn update(&self, key: &str, value: Value) -> HostResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
