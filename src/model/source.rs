use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::sync;

/// Identifier of an effect parameter, e.g. `"rect"` or `"level"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ParamId(pub String);

impl ParamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParamId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where keyframe models read their serialized animation from, and where they write it
/// back after every committed change.
pub trait ParameterSource: Send + Sync {
    fn value(&self, param: &ParamId) -> Option<String>;

    fn set_value(&self, param: &ParamId, value: String);
}

/// In-memory parameter store, handy for tests and for tools that have no asset model.
#[derive(Debug, Default)]
pub struct MemoryParameterSource {
    values: RwLock<BTreeMap<ParamId, String>>,
    writes: AtomicUsize,
}

impl MemoryParameterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, param: impl Into<ParamId>, value: impl Into<String>) -> Self {
        self.insert(param, value);
        self
    }

    /// Set a value without counting it as a write-back.
    pub fn insert(&self, param: impl Into<ParamId>, value: impl Into<String>) {
        sync::write(&self.values).insert(param.into(), value.into());
    }

    pub fn get(&self, param: &str) -> Option<String> {
        sync::read(&self.values).get(&ParamId::from(param)).cloned()
    }

    /// Number of `set_value` calls received so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ParameterSource for MemoryParameterSource {
    fn value(&self, param: &ParamId) -> Option<String> {
        sync::read(&self.values).get(param).cloned()
    }

    fn set_value(&self, param: &ParamId, value: String) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        sync::write(&self.values).insert(param.clone(), value);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/source.rs"]
mod tests;
