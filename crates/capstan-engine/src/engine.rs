//! Materialization engine: turns a capability source and resolved values
//! into concrete manifests or a chart value tree

use capstan_core::{CapSource, Materialization, RepoSpec, ResolvedValueSet};
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::expand::expand_values;
use crate::placeholder::substitute;

/// Result of materializing a capability source
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Substituted manifest objects, in template order
    Manifests(Vec<JsonValue>),

    /// Chart reference with the expanded value tree
    Chart { repo: RepoSpec, values: JsonValue },
}

/// Engine builder
pub struct EngineBuilder {
    descend_into_sequences: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            descend_into_sequences: false,
        }
    }

    /// Also substitute placeholders inside sequence elements
    pub fn descend_into_sequences(mut self, descend: bool) -> Self {
        self.descend_into_sequences = descend;
        self
    }

    /// Build the engine
    pub fn build(self) -> Engine {
        Engine::new(self.descend_into_sequences)
    }
}

/// The materialization engine
#[derive(Debug, Clone, Default)]
pub struct Engine {
    descend_into_sequences: bool,
}

impl Engine {
    pub fn new(descend_into_sequences: bool) -> Self {
        Self {
            descend_into_sequences,
        }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Substitute placeholders in an arbitrary document
    pub fn substitute(&self, doc: &JsonValue, values: &ResolvedValueSet) -> Result<JsonValue> {
        substitute(doc, values, self.descend_into_sequences)
    }

    /// Substitute each inline manifest template
    pub fn render_manifests(
        &self,
        templates: &[JsonValue],
        values: &ResolvedValueSet,
    ) -> Result<Vec<JsonValue>> {
        templates
            .iter()
            .enumerate()
            .map(|(index, template)| {
                if !template.is_object() {
                    return Err(EngineError::InvalidManifest {
                        index,
                        message: format!("found {}", json_type_name(template)),
                    });
                }
                self.substitute(template, values)
            })
            .collect()
    }

    /// Check the source and materialize it
    pub fn materialize(&self, source: &CapSource, values: &ResolvedValueSet) -> Result<Rendered> {
        match source.check()? {
            Materialization::Inline(templates) => {
                Ok(Rendered::Manifests(self.render_manifests(templates, values)?))
            }
            Materialization::Chart(repo) => Ok(Rendered::Chart {
                repo: repo.clone(),
                values: expand_values(values),
            }),
        }
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
