//! Value resolution: merge fixed values, overrides and caller inputs
//!
//! Precedence, lowest to highest:
//! 1. fixed values declared by the capability (or dependency)
//! 2. extra override maps, in argument order
//! 3. caller values matched against the declared inputs
//!
//! Later sources overwrite identically-keyed entries of earlier ones. The
//! result keeps every write in order; lookups and map views apply
//! last-write-wins.

use indexmap::IndexMap;

use crate::app::AppValue;
use crate::capability::{CapValue, Capability, CapabilityDependency, InputSpec};
use crate::error::{CoreError, Result};
use crate::value::Value;

/// Placeholder shown instead of sensitive values
pub const REDACTED: &str = "<redacted>";

/// One resolved `(targetId, value)` pair
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub target_id: String,
    pub value: Value,
    /// Set for values of `password` inputs
    pub sensitive: bool,
}

impl ResolvedValue {
    /// Render for humans, hiding sensitive values
    pub fn display_value(&self) -> String {
        if self.sensitive {
            return REDACTED.to_string();
        }
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// Ordered list of resolved values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedValueSet {
    entries: Vec<ResolvedValue>,
}

impl ResolvedValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target_id: impl Into<String>, value: Value, sensitive: bool) {
        self.entries.push(ResolvedValue {
            target_id: target_id.into(),
            value,
            sensitive,
        });
    }

    /// Latest value written for `target_id`
    pub fn get(&self, target_id: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.target_id == target_id)
            .map(|e| &e.value)
    }

    pub fn contains(&self, target_id: &str) -> bool {
        self.entries.iter().any(|e| e.target_id == target_id)
    }

    /// Whether the latest write for `target_id` is sensitive
    pub fn is_sensitive(&self, target_id: &str) -> bool {
        self.entries
            .iter()
            .rev()
            .find(|e| e.target_id == target_id)
            .is_some_and(|e| e.sensitive)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finalized view: first-insertion order, last write wins
    pub fn to_map(&self) -> IndexMap<String, Value> {
        let mut map = IndexMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            map.insert(entry.target_id.clone(), entry.value.clone());
        }
        map
    }

    /// Finalized view with the entries for display, sensitive values hidden
    pub fn display_entries(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            map.insert(entry.target_id.clone(), entry.display_value());
        }
        map
    }
}

/// Resolve a value set from its layered sources
pub fn resolve_values(
    inputs: &[InputSpec],
    fixed: &[CapValue],
    caller: &[AppValue],
    overrides: &[IndexMap<String, Value>],
) -> Result<ResolvedValueSet> {
    let mut resolved = ResolvedValueSet::new();

    for cv in fixed {
        resolved.push(cv.target_id.clone(), cv.value.clone(), false);
    }

    for layer in overrides {
        for (target_id, value) in layer {
            resolved.push(target_id.clone(), value.clone(), false);
        }
    }

    let supplied: IndexMap<&str, &Value> = caller
        .iter()
        .map(|v| (v.key.as_str(), &v.value))
        .collect();

    for input in inputs {
        let Some(value) = supplied.get(input.key.as_str()) else {
            if input.optional {
                continue;
            }
            return Err(CoreError::MissingRequiredInput {
                key: input.key.clone(),
            });
        };

        if !input.input_type.accepts(value) {
            return Err(CoreError::TypeMismatch {
                key: input.key.clone(),
                expected: input.input_type,
            });
        }

        resolved.push(
            input.target(),
            (*value).clone(),
            input.input_type.is_sensitive(),
        );
    }

    Ok(resolved)
}

impl Capability {
    /// Resolve this capability's values for a set of caller values
    pub fn resolve(
        &self,
        caller: &[AppValue],
        overrides: &[IndexMap<String, Value>],
    ) -> Result<ResolvedValueSet> {
        resolve_values(&self.spec.inputs, &self.spec.values, caller, overrides)
    }
}

impl CapabilityDependency {
    /// Resolve a dependency from its own fixed values
    pub fn resolve(&self, overrides: &[IndexMap<String, Value>]) -> Result<ResolvedValueSet> {
        resolve_values(&[], &self.spec.values, &[], overrides)
    }
}
