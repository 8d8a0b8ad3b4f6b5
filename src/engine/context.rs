// ABOUTME: Run-scoped execution context shared by the steps of one task or workflow run
// ABOUTME: Maps names to the most recently produced values; last write wins

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Values produced during a run, keyed by tool id or result name.
///
/// A context is owned by exactly one run. Executors clone it before writing,
/// so a caller's context is never mutated behind its back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext {
    values: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Store a value, replacing whatever was stored under `name` before.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Apply writes in order; later entries overwrite earlier ones.
    pub fn apply<I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (name, value) in updates {
            self.values.insert(name, value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Text used when a value is spliced into a string parameter.
    ///
    /// Strings are inserted as-is; every other value uses its JSON text.
    pub fn render(&self, name: &str) -> Option<String> {
        self.values.get(name).map(render_value)
    }

    pub fn into_inner(self) -> HashMap<String, Value> {
        self.values
    }
}

pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl From<HashMap<String, Value>> for ExecutionContext {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, Value)> for ExecutionContext {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
