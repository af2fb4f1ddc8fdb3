//! Environment variable access for route evaluation.
//!
//! # Responsibilities
//! - Abstract environment lookups behind `EnvSource`
//! - Gate lookups through a route's allow-list
//! - Apply and restore process environment overrides for self-tests
//!
//! # Design Decisions
//! - Names outside the allow-list read as an empty string, never an error
//! - `EnvOverride` restores prior values on drop, so restoration happens on
//!   every exit path including failed assertions

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Read-only source of environment variables.
pub trait EnvSource: Send + Sync + fmt::Debug {
    /// Returns the value of `key`, or `None` if unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the live process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed set of variables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// An `EnvSource` restricted to a route's allow-list.
#[derive(Debug, Clone)]
pub struct AllowListedEnv {
    allowlist: Arc<HashSet<String>>,
    source: Arc<dyn EnvSource>,
}

impl AllowListedEnv {
    pub fn new(allowlist: Arc<HashSet<String>>, source: Arc<dyn EnvSource>) -> Self {
        Self { allowlist, source }
    }

    /// Returns the variable's value if allow-listed and set, otherwise `""`.
    pub fn get(&self, key: &str) -> String {
        if !self.allowlist.contains(key) {
            return String::new();
        }
        self.source.var(key).unwrap_or_default()
    }
}

/// Guard that sets process environment variables and restores the previous
/// values (or their absence) when dropped.
///
/// Mutates process-global state: callers must serialize overlapping use.
pub struct EnvOverride {
    previous: Vec<(String, Option<String>)>,
}

impl EnvOverride {
    pub fn apply(overrides: &BTreeMap<String, String>) -> Self {
        let mut previous = Vec::with_capacity(overrides.len());
        for (key, value) in overrides {
            previous.push((key.clone(), std::env::var(key).ok()));
            std::env::set_var(key, value);
        }
        Self { previous }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}

impl fmt::Debug for EnvOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvOverride")
            .field("keys", &self.previous.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}
