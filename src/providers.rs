//! Shared provider traits for dependency injection.
//!
//! This module contains common traits used across the codebase to enable
//! testability through dependency injection. Backend selection depends on
//! which credentials are present in the process environment, so environment
//! lookups go through [`EnvProvider`] instead of `std::env` directly.

use std::collections::HashMap;

/// Trait for reading environment variables.
///
/// This abstraction enables deterministic testing of configuration loading
/// without mutating the real process environment.
///
/// # Example
///
/// ```
/// use suggest::providers::{EnvProvider, SystemEnvProvider};
///
/// let provider = SystemEnvProvider;
/// // PATH is set in any reasonable test environment
/// assert!(provider.var("PATH").is_some());
/// ```
pub trait EnvProvider: Send + Sync {
    /// Returns the value of the variable, or `None` if it is unset or not UTF-8.
    fn var(&self, key: &str) -> Option<String>;

    /// Returns true if the variable is set to any value.
    fn is_set(&self, key: &str) -> bool {
        self.var(key).is_some()
    }
}

/// Default environment provider backed by the process environment.
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Environment provider backed by a fixed map.
///
/// Used by tests and by callers that want to pin the environment seen by
/// [`crate::config::Config`].
#[derive(Debug, Default, Clone)]
pub struct MapEnvProvider {
    vars: HashMap<String, String>,
}

impl MapEnvProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvProvider for MapEnvProvider {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
